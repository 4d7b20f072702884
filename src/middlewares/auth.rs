use crate::error::AppError;
use crate::utils::JwtService;
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// Id of the caller whose bearer token was verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

// 必须登录的路径; 其余路径允许匿名访问（匿名时只有公开内容规则）
struct ProtectedPaths {
    prefix_paths: Vec<&'static str>,
    suffix_paths: Vec<(&'static str, &'static str)>,
}

impl ProtectedPaths {
    fn new() -> Self {
        Self {
            prefix_paths: vec!["/api/v1/entitlements", "/api/v1/admin/"],
            // (前缀, 后缀) 同时匹配
            suffix_paths: vec![("/api/v1/bulk-coupons/", "/redeem")],
        }
    }

    fn requires_auth(&self, path: &str) -> bool {
        self.prefix_paths.iter().any(|&prefix| path.starts_with(prefix))
            || self
                .suffix_paths
                .iter()
                .any(|&(prefix, suffix)| path.starts_with(prefix) && path.ends_with(suffix))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            protected_paths: ProtectedPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    protected_paths: ProtectedPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::to_string);

        match token {
            Some(token) => match self.jwt_service.verify_access_token(&token) {
                Ok(claims) => {
                    // 将用户ID添加到请求扩展中
                    req.extensions_mut().insert(AuthenticatedUser(claims.sub));
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(_) => {
                    let error = AppError::AuthError("Invalid access token".to_string());
                    Box::pin(async move { Err(error.into()) })
                }
            },
            None if self.protected_paths.requires_auth(req.path()) => {
                let error = AppError::AuthError("Missing access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
            None => {
                let fut = self.service.call(req);
                Box::pin(fut)
            }
        }
    }
}

/// 用于获取当前用户ID的辅助函数
pub fn get_current_user_id(req: &HttpRequest) -> Option<String> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0.clone())
}
