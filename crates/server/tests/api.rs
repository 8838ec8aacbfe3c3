use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

use models::Principal;
use server::auth::{ServerAuthConfig, ServerState};
use server::routes;
use service::runtime::{StorageTarget, Stores};

struct TestApp {
    router: Router,
    auth: ServerAuthConfig,
}

struct Reply {
    status: StatusCode,
    body: Value,
    set_cookie: Option<String>,
}

impl TestApp {
    async fn new() -> anyhow::Result<Self> {
        let stores = Stores::open(&StorageTarget::Memory).await?;
        let auth = ServerAuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: 1 };
        let state = ServerState { stores, auth: auth.clone() };
        Ok(Self { router: routes::build_router(state, CorsLayer::very_permissive()), auth })
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<Reply> {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
            None => req.body(Body::empty())?,
        };
        self.dispatch(req).await
    }

    async fn dispatch(&self, req: Request<Body>) -> anyhow::Result<Reply> {
        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok(Reply { status, body, set_cookie })
    }

    /// Sign up and return (user id, login token).
    async fn signup(&self, username: &str, fullname: &str) -> anyhow::Result<(String, String)> {
        let reply = self
            .send(
                "POST",
                "/api/auth/signup",
                None,
                Some(json!({"username": username, "fullname": fullname, "password": "secret1"})),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::OK, "signup {username}: {}", reply.body);
        let token = login_token(reply.set_cookie.as_deref()).expect("login cookie");
        let id = reply.body["_id"].as_str().expect("user id").to_string();
        Ok((id, token))
    }

    fn admin_token(&self) -> String {
        let admin = Principal { id: "admin-1".into(), fullname: "Admin".into(), score: 0, is_admin: true };
        self.auth.issue(&admin).expect("admin token")
    }
}

fn login_token(set_cookie: Option<&str>) -> Option<String> {
    set_cookie?
        .split(';')
        .next()?
        .strip_prefix("loginToken=")
        .map(str::to_string)
        .filter(|t| !t.is_empty())
}

#[tokio::test]
async fn health_is_ok() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let reply = app.send("GET", "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn signup_sets_cookie_and_hides_password() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let reply = app
        .send(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"username": "puki", "password": "pw", "isAdmin": true})),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(login_token(reply.set_cookie.as_deref()).is_some());
    assert!(reply.body.get("password").is_none());
    assert_eq!(reply.body["isAdmin"], false);
    assert_eq!(reply.body["fullname"], "puki");

    let list = app.send("GET", "/api/user", None, None).await?;
    assert_eq!(list.status, StatusCode::OK);
    let users = list.body.as_array().expect("array");
    assert_eq!(users.len(), 1);
    assert!(users[0].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_signup_conflicts_and_login_checks_password() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.signup("muki", "Muki Ba").await?;

    let dup = app
        .send("POST", "/api/auth/signup", None, Some(json!({"username": "muki", "password": "other"})))
        .await?;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let wrong = app
        .send("POST", "/api/auth/login", None, Some(json!({"username": "muki", "password": "nope"})))
        .await?;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let ok = app
        .send("POST", "/api/auth/login", None, Some(json!({"username": "muki", "password": "secret1"})))
        .await?;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["username"], "muki");
    assert!(login_token(ok.set_cookie.as_deref()).is_some());

    let out = app.send("POST", "/api/auth/logout", None, None).await?;
    assert_eq!(out.status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn anonymous_and_invalid_tokens_cannot_create() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let toy = json!({"name": "Ball", "price": 30, "inStock": true});

    let anon = app.send("POST", "/api/toy", None, Some(toy.clone())).await?;
    assert_eq!(anon.status, StatusCode::UNAUTHORIZED);

    let forged = app.send("POST", "/api/toy", Some("not-a-jwt"), Some(toy)).await?;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let list = app.send("GET", "/api/toy", None, None).await?;
    assert_eq!(list.body, json!([]));
    Ok(())
}

#[tokio::test]
async fn toy_ownership_lifecycle() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (alice_id, alice) = app.signup("alice", "Alice A").await?;
    let (_, bob) = app.signup("bob", "Bob B").await?;

    // cookie auth works the same as the bearer header
    let req = Request::builder()
        .method("POST")
        .uri("/api/toy")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("loginToken={alice}"))
        .body(Body::from(serde_json::to_vec(&json!({"name": "Ball", "price": 30, "inStock": true}))?))?;
    let created = app.dispatch(req).await?;
    assert_eq!(created.status, StatusCode::OK, "{}", created.body);
    assert_eq!(created.body["owner"]["_id"], alice_id.as_str());
    assert_eq!(created.body["owner"]["fullname"], "Alice A");
    let toy_id = created.body["_id"].as_str().expect("toy id").to_string();
    let uri = format!("/api/toy/{toy_id}");

    let by_bob = app
        .send("PUT", &uri, Some(&bob), Some(json!({"name": "Stolen", "price": 1, "inStock": false})))
        .await?;
    assert_eq!(by_bob.status, StatusCode::UNAUTHORIZED);

    let by_alice = app
        .send("PUT", &uri, Some(&alice), Some(json!({"name": "Big Ball", "price": 35, "inStock": true})))
        .await?;
    assert_eq!(by_alice.status, StatusCode::OK);
    assert_eq!(by_alice.body["name"], "Big Ball");
    assert_eq!(by_alice.body["owner"]["_id"], alice_id.as_str());

    let bob_delete = app.send("DELETE", &uri, Some(&bob), None).await?;
    assert_eq!(bob_delete.status, StatusCode::UNAUTHORIZED);

    let admin_delete = app.send("DELETE", &uri, Some(&app.admin_token()), None).await?;
    assert_eq!(admin_delete.status, StatusCode::NO_CONTENT);

    let gone = app.send("GET", &uri, None, None).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn toy_list_honours_query_filters() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.signup("shop", "Shop Keeper").await?;
    for toy in [
        json!({"name": "Ball", "price": 30, "inStock": true}),
        json!({"name": "Bat", "price": 80, "inStock": true}),
        json!({"name": "Basket", "price": 20, "inStock": false}),
        json!({"name": "Doll", "price": 10, "inStock": true}),
        json!({"name": "Balloon", "inStock": true}),
    ] {
        let reply = app.send("POST", "/api/toy", Some(&token), Some(toy)).await?;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let reply = app.send("GET", "/api/toy?txt=BA&maxPrice=50&stockStatus=true", None, None).await?;
    let names: Vec<&str> = reply.body.as_array().expect("array").iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, vec!["Ball"]);

    // bad numbers are ignored, not rejected
    let reply = app.send("GET", "/api/toy?maxPrice=cheap", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn car_validation_and_missing_ids() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.signup("driver", "Dee Driver").await?;

    let invalid = app.send("POST", "/api/car", Some(&token), Some(json!({"speed": 120}))).await?;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let created = app
        .send("POST", "/api/car", Some(&token), Some(json!({"vendor": "Subaru", "speed": 180, "price": 9000})))
        .await?;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["vendor"], "Subaru");

    let missing = app.send("PUT", "/api/car/nope", Some(&token), Some(json!({"vendor": "Fiat"}))).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let missing = app.send("DELETE", "/api/car/nope", Some(&token), None).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn users_update_only_themselves() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (alice_id, alice) = app.signup("alice", "Alice A").await?;
    let (bob_id, bob) = app.signup("bob", "Bob B").await?;

    let denied = app
        .send("PUT", &format!("/api/user/{alice_id}"), Some(&bob), Some(json!({"fullname": "Hacked"})))
        .await?;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let updated = app
        .send("PUT", &format!("/api/user/{alice_id}"), Some(&alice), Some(json!({"fullname": "Alice Z", "score": 50})))
        .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["fullname"], "Alice Z");
    assert_eq!(updated.body["username"], "alice");
    assert_eq!(updated.body["score"], 50);

    let removed = app.send("DELETE", &format!("/api/user/{bob_id}"), Some(&bob), None).await?;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let gone = app.send("GET", &format!("/api/user/{bob_id}"), None, None).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    Ok(())
}
