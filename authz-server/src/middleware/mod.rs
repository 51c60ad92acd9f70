pub mod interceptor;

pub use interceptor::{
    intercept_middleware, CurrentUser, Intercepted, Interceptor, InterceptorState, RouteAuth,
    Stage,
};
