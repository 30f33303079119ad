//! Request interceptors.

use crate::request::RequestTemplate;

/// Mutates the resolved request template before it is sent.
///
/// Interceptors run in registration order on every attempt, after template
/// resolution and before the target URL is applied. They see (and may
/// change) headers, queries, and body.
pub trait RequestInterceptor: Send + Sync {
    /// Applies this interceptor to the outgoing template.
    fn apply(&self, template: &mut RequestTemplate);
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut RequestTemplate) + Send + Sync,
{
    fn apply(&self, template: &mut RequestTemplate) {
        self(template)
    }
}

/// Adds a bearer-token `Authorization` header to every request.
#[derive(Debug)]
pub struct BearerAuthInterceptor {
    header_value: String,
}

impl BearerAuthInterceptor {
    /// Creates an interceptor for the given token.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            header_value: format!("Bearer {}", token.as_ref()),
        }
    }
}

impl RequestInterceptor for BearerAuthInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        template.header_literal("Authorization", std::slice::from_ref(&self.header_value));
    }
}
