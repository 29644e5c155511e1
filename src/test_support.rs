//! Real router on an ephemeral port, driven over HTTP.

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::{
    app::{build_app, API_KEY_HEADER},
    auth::dto::AuthResponse,
    state::AppState,
};

/// Serves the app on `127.0.0.1:0` and returns its base URL (without `/api`).
pub async fn spawn_app(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

pub struct TestApp {
    pub base_url: String,
    pub api_key: String,
    pub http: Client,
}

impl TestApp {
    pub async fn spawn(state: AppState) -> Self {
        let api_key = state.config.api_key.clone();
        Self {
            base_url: spawn_app(state).await,
            api_key,
            http: Client::new(),
        }
    }

    fn request(&self, req: RequestBuilder, auth: Option<&AuthResponse>) -> RequestBuilder {
        let req = req.header(API_KEY_HEADER, &self.api_key);
        match auth {
            Some(auth) => req.bearer_auth(&auth.access_token),
            None => req,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str, auth: Option<&AuthResponse>) -> Response {
        self.request(self.http.get(self.url(path)), auth)
            .send()
            .await
            .expect("send")
    }

    pub async fn post<B: Serialize>(&self, path: &str, auth: &AuthResponse, body: &B) -> Response {
        self.request(self.http.post(self.url(path)).json(body), Some(auth))
            .send()
            .await
            .expect("send")
    }

    pub async fn put<B: Serialize>(&self, path: &str, auth: &AuthResponse, body: &B) -> Response {
        self.request(self.http.put(self.url(path)).json(body), Some(auth))
            .send()
            .await
            .expect("send")
    }

    pub async fn register(&self, email: &str, role: &str, company: Option<&str>) -> AuthResponse {
        let body = json!({
            "email": email,
            "password": "long-password",
            "role": role,
            "company_name": company,
        });
        let resp = self
            .request(self.http.post(self.url("/auth/register")).json(&body), None)
            .send()
            .await
            .expect("send");
        assert!(resp.status().is_success(), "register failed: {}", resp.status());
        resp.json().await.expect("auth response")
    }
}
