use std::fmt;

use log::{info, warn};
use serde::Deserialize;

use crate::invoices::ActionOutcome;
use crate::user_service::UserStore;

pub const CREDENTIALS_PROVIDER: &str = "credentials";
pub const DEFAULT_LOGIN_REDIRECT: &str = "/dashboard";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub redirect_to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthErrorKind {
    CredentialsSignin,
    AccessDenied,
    Configuration,
    Other(String),
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsSignin => f.write_str("CredentialsSignin"),
            Self::AccessDenied => f.write_str("AccessDenied"),
            Self::Configuration => f.write_str("Configuration"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// A rejection the sign-in layer recognizes, discriminated by `kind`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("sign-in rejected: {kind}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SignInError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Unexpected(#[from] eyre::Report),
}

pub trait SignIn {
    /// Returns the path to send the signed-in user to.
    async fn sign_in(&self, provider: &str, form: &CredentialsForm) -> Result<String, SignInError>;
}

/// Runs the credentials sign-in and turns recognized rejections into form
/// messages. Anything the auth layer does not recognize is returned as is.
pub async fn authenticate<P: SignIn>(
    provider: &P,
    form: &CredentialsForm,
) -> eyre::Result<ActionOutcome> {
    match provider.sign_in(CREDENTIALS_PROVIDER, form).await {
        Ok(path) => Ok(ActionOutcome::Redirect(path)),
        Err(SignInError::Auth(AuthError {
            kind: AuthErrorKind::CredentialsSignin,
        })) => Ok(ActionOutcome::failed("Invalid credentials.")),
        Err(SignInError::Auth(err)) => {
            warn!("{err}");
            Ok(ActionOutcome::failed("Something went wrong."))
        }
        Err(SignInError::Unexpected(report)) => Err(report),
    }
}

struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    fn parse(form: &CredentialsForm) -> Option<Self> {
        let email = form.email.as_deref()?.trim();
        let password = form.password.as_deref()?;
        if !email.contains('@') || password.chars().count() < MIN_PASSWORD_LEN {
            return None;
        }
        Some(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

/// `stored` is a bcrypt hash. An unreadable hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(matches) => matches,
        Err(err) => {
            warn!("Unreadable password hash: {err}");
            false
        }
    }
}

/// Only same-site absolute paths are followed after sign-in.
fn landing_path(form: &CredentialsForm) -> String {
    match form.redirect_to.as_deref() {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => DEFAULT_LOGIN_REDIRECT.to_string(),
    }
}

/// E-mail and password checked against the `users` table.
pub struct CredentialsProvider<U> {
    users: U,
}

impl<U: UserStore> CredentialsProvider<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }
}

impl<U: UserStore> SignIn for CredentialsProvider<U> {
    async fn sign_in(&self, provider: &str, form: &CredentialsForm) -> Result<String, SignInError> {
        if provider != CREDENTIALS_PROVIDER {
            return Err(AuthError::new(AuthErrorKind::Configuration).into());
        }
        let rejected = || AuthError::new(AuthErrorKind::CredentialsSignin);

        let credentials = Credentials::parse(form).ok_or_else(rejected)?;
        let user = self
            .users
            .find_user_by_email(&credentials.email)
            .await?
            .ok_or_else(rejected)?;
        if !verify_password(&credentials.password, &user.password) {
            warn!("Wrong password for user {}", user.id);
            return Err(rejected().into());
        }

        info!("User {} ({}) signed in", user.name, user.id);
        Ok(landing_path(form))
    }
}
