use service_core::error::AppError;

pub async fn not_found() -> AppError {
    AppError::not_found("Not found resource path.")
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
