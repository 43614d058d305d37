// Template renderer contract. Markup is out of scope for this crate: the
// shipped renderer emits a minimal HTML shell carrying the template name and
// the context payload, and deployments substitute a real template engine
// behind the same trait.
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde_json::{json, Map, Value};

use crate::auth::AuthContext;

/// Context mapping handed to the renderer. Every response path includes the
/// AuthContext fields, so templates can assume they are always present.
pub type RenderContext = Map<String, Value>;

/// Template used when the gate denies access; rendered with HTTP 404 so a
/// denial is indistinguishable from a missing page.
pub const LIMBO_TEMPLATE: &str = "admin/limbo.html";

/// Base context for a request: the AuthContext fields, nothing else yet.
pub fn base_context(auth: &AuthContext) -> RenderContext {
    let mut context = RenderContext::new();
    context.insert("is_authenticated".to_string(), json!(auth.is_authenticated));
    context.insert("is_member".to_string(), json!(auth.is_member));
    context.insert("user".to_string(), json!(auth.user_identity));
    context
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, template: &str, context: &RenderContext, status: StatusCode)
        -> Response;
}

/// Default renderer: an HTML shell with the template name on the root element
/// and the context embedded as JSON.
#[derive(Default, Clone)]
pub struct ShellRenderer;

#[async_trait]
impl Renderer for ShellRenderer {
    async fn render(
        &self,
        template: &str,
        context: &RenderContext,
        status: StatusCode,
    ) -> Response {
        let payload = serde_json::to_string(&Value::Object(context.clone()))
            .unwrap_or_else(|_| "{}".to_string());
        let body = format!(
            "<!doctype html>\n<html data-template=\"{}\">\n<body>\n\
             <script type=\"application/json\" id=\"context\">{}</script>\n\
             </body>\n</html>\n",
            template, payload
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;

    #[test]
    fn base_context_always_carries_auth_fields() {
        let context = base_context(&AuthContext::anonymous());
        assert_eq!(context.get("is_authenticated"), Some(&json!(false)));
        assert_eq!(context.get("is_member"), Some(&Value::Null));
        assert_eq!(context.get("user"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn shell_renderer_reports_template_and_status() {
        let renderer = ShellRenderer;
        let response = renderer
            .render(LIMBO_TEMPLATE, &RenderContext::new(), StatusCode::NOT_FOUND)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
