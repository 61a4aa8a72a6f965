use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};

use super::AppState;
use crate::ApiError;

const SWAGGER_UI: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>zebra-workflow API</title>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/4.15.5/swagger-ui.css" crossorigin="anonymous"/>
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/4.15.5/swagger-ui-bundle.min.js"></script>
  <script>
    window.onload = function() {
      window.ui = SwaggerUIBundle({
        url: '/swagger/openapi.yaml',
        dom_id: '#swagger-ui',
        deepLinking: true,
        presets: [SwaggerUIBundle.presets.apis],
        layout: "BaseLayout"
      });
    };
  </script>
</body>
</html>"#;

pub async fn ui() -> Html<&'static str> {
    Html(SWAGGER_UI)
}

pub async fn spec(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = tokio::fs::read_to_string(&state.openapi_path)
        .await
        .map_err(|source| ApiError::Io {
            path: state.openapi_path.clone(),
            source,
        })?;
    Ok(([(header::CONTENT_TYPE, "application/yaml; charset=utf-8")], body))
}
