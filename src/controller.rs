use crate::app_state::AppState;
use crate::auth::{authenticate, CredentialsForm, SignIn};
use crate::invoices::{ActionOutcome, InvoiceForm};
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::error;

#[derive(thiserror::Error, Debug)]
pub enum RouteError {
    #[error("Database Error: failed to fetch invoices")]
    FetchFailed(eyre::Report),
    #[error("Invoice not found")]
    NotFound,
    #[error(transparent)]
    UnexpectedError(#[from] eyre::Error),
}

impl ResponseError for RouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            RouteError::NotFound => StatusCode::NOT_FOUND,
            RouteError::FetchFailed(_) | RouteError::UnexpectedError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            RouteError::FetchFailed(report) => {
                error!("Failed to fetch invoices: {report}");
                self.to_string()
            }
            RouteError::NotFound => self.to_string(),
            RouteError::UnexpectedError(report) => {
                error!("Unhandled error: {report}");
                "Internal Server Error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).body(message)
    }
}

/// Maps a form action's outcome onto the response the calling page expects.
fn outcome_response(outcome: ActionOutcome) -> HttpResponse {
    match outcome {
        ActionOutcome::Redirect(path) => HttpResponse::SeeOther()
            .insert_header((header::LOCATION, path))
            .finish(),
        ActionOutcome::Done => HttpResponse::NoContent().finish(),
        ActionOutcome::Invalid(state) => HttpResponse::UnprocessableEntity().json(state),
        ActionOutcome::Failed(state) => HttpResponse::InternalServerError().json(state),
    }
}

pub async fn list_invoices(ctx: web::Data<AppState>) -> Result<impl Responder, RouteError> {
    let body = ctx
        .invoice_manager
        .list_invoices()
        .await
        .map_err(RouteError::FetchFailed)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

pub async fn edit_invoice(
    path: web::Path<(String,)>,
    ctx: web::Data<AppState>,
) -> Result<impl Responder, RouteError> {
    let invoice = ctx
        .invoice_manager
        .get_invoice(&path.into_inner().0)
        .await
        .map_err(RouteError::FetchFailed)?
        .ok_or(RouteError::NotFound)?;
    Ok(web::Json(invoice))
}

pub async fn create_invoice(
    form: web::Form<InvoiceForm>,
    ctx: web::Data<AppState>,
) -> impl Responder {
    outcome_response(ctx.invoice_manager.create_invoice(&form).await)
}

pub async fn update_invoice(
    path: web::Path<(String,)>,
    form: web::Form<InvoiceForm>,
    ctx: web::Data<AppState>,
) -> impl Responder {
    let id = path.into_inner().0;
    outcome_response(ctx.invoice_manager.update_invoice(&id, &form).await)
}

pub async fn delete_invoice(
    path: web::Path<(String,)>,
    ctx: web::Data<AppState>,
) -> impl Responder {
    outcome_response(ctx.invoice_manager.delete_invoice(&path.into_inner().0).await)
}

/// A rejected sign-in is 401; failures the auth layer does not recognize become 500.
async fn sign_in_response<P: SignIn>(
    sign_in: &P,
    form: &CredentialsForm,
) -> Result<HttpResponse, RouteError> {
    let response = match authenticate(sign_in, form).await? {
        ActionOutcome::Failed(state) => HttpResponse::Unauthorized().json(state),
        outcome => outcome_response(outcome),
    };
    Ok(response)
}

pub async fn login(
    form: web::Form<CredentialsForm>,
    ctx: web::Data<AppState>,
) -> Result<impl Responder, RouteError> {
    sign_in_response(ctx.sign_in.as_ref(), &form).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthErrorKind, SignInError};
    use crate::invoices::ActionState;
    use actix_web::body::to_bytes;
    use std::collections::BTreeMap;

    #[test]
    fn redirect_is_see_other_with_location() {
        let response = outcome_response(ActionOutcome::Redirect("/dashboard/invoices".to_string()));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/dashboard/invoices"
        );
    }

    #[test]
    fn done_has_no_content() {
        let response = outcome_response(ActionOutcome::Done);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn invalid_form_state_is_returned_as_json() {
        let errors = BTreeMap::from([("amount", vec!["Please enter a valid amount.".to_string()])]);
        let response = outcome_response(ActionOutcome::Invalid(ActionState {
            errors: Some(errors),
            message: Some("Missing Fields. Failed to Create Invoice.".to_string()),
        }));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errors"]["amount"][0], "Please enter a valid amount.");
        assert_eq!(json["message"], "Missing Fields. Failed to Create Invoice.");
    }

    #[actix_web::test]
    async fn persistence_failure_is_a_server_error() {
        let response =
            outcome_response(ActionOutcome::failed("Database error: failed to delete invoice"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(
            body.as_ref(),
            br#"{"message":"Database error: failed to delete invoice"}"#
        );
    }

    #[actix_web::test]
    async fn unexpected_errors_hide_their_cause() {
        let err = RouteError::UnexpectedError(eyre::eyre!("password column missing"));
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body.as_ref(), b"Internal Server Error");
        assert_eq!(RouteError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    enum Scripted {
        Reject(AuthErrorKind),
        Crash,
    }

    impl SignIn for Scripted {
        async fn sign_in(&self, _: &str, _: &CredentialsForm) -> Result<String, SignInError> {
            match self {
                Self::Reject(kind) => Err(AuthError::new(kind.clone()).into()),
                Self::Crash => Err(eyre::eyre!("users table missing").into()),
            }
        }
    }

    #[actix_web::test]
    async fn rejected_login_is_unauthorized() {
        let response = sign_in_response(
            &Scripted::Reject(AuthErrorKind::CredentialsSignin),
            &CredentialsForm::default(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"message":"Invalid credentials."}"#);
    }

    #[actix_web::test]
    async fn unexpected_login_failure_is_a_server_error() {
        let err = sign_in_response(&Scripted::Crash, &CredentialsForm::default())
            .await
            .unwrap_err();
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body.as_ref(), b"Internal Server Error");
    }
}
