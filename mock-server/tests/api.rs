use axum::http::{self, Request, StatusCode};
use axum::routing::RouterIntoService;
use http_body_util::BodyExt;
use mock_server::{
    app, Cart, LoginResponse, Medicine, Message, User, ADMIN_EMAIL, DEMO_PASSWORD, DOCTOR_EMAIL,
    PATIENT_EMAIL,
};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn login_request(email: &str, password: &str) -> Request<String> {
    json_request(
        "POST",
        "/api/auth/login",
        None,
        &format!(r#"{{"email":"{email}","password":"{password}"}}"#),
    )
}

/// Log in on a long-lived service so later calls see the issued session.
async fn login(app: &mut RouterIntoService<String>, email: &str) -> LoginResponse {
    let resp = ServiceExt::ready(app)
        .await
        .unwrap()
        .call(login_request(email, DEMO_PASSWORD))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

// --- public routes ---

#[tokio::test]
async fn departments_are_public() {
    let resp = app()
        .oneshot(json_request("GET", "/api/patient/departments", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let departments: Vec<String> = body_json(resp).await;
    assert!(departments.contains(&"Cardiology".to_string()));
}

#[tokio::test]
async fn medicines_are_public() {
    let resp = app()
        .oneshot(json_request("GET", "/api/pharmacy/medicines", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let medicines: Vec<Medicine> = body_json(resp).await;
    assert_eq!(medicines.len(), 3);
}

// --- auth ---

#[tokio::test]
async fn login_with_bad_password_returns_401() {
    let resp = app()
        .oneshot(login_request(DOCTOR_EMAIL, "wrong"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let msg: Message = body_json(resp).await;
    assert_eq!(msg.message, "Invalid credentials");
}

#[tokio::test]
async fn login_with_malformed_body_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/login", None, r#"{"email":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn me_without_token_returns_401() {
    let resp = app()
        .oneshot(json_request("GET", "/api/auth/me", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let msg: Message = body_json(resp).await;
    assert_eq!(msg.message, "Missing token");
}

#[tokio::test]
async fn me_with_unknown_token_returns_401() {
    let resp = app()
        .oneshot(json_request("GET", "/api/auth/me", Some("forged"), ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let msg: Message = body_json(resp).await;
    assert_eq!(msg.message, "Invalid token");
}

#[tokio::test]
async fn login_then_me_returns_user() {
    let mut app = app().into_service();
    let session = login(&mut app, DOCTOR_EMAIL).await;
    assert_eq!(session.role, "doctor");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("GET", "/api/auth/me", Some(&session.token), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: User = body_json(resp).await;
    assert_eq!(me.id, session.user_id);
    assert_eq!(me.email, DOCTOR_EMAIL);
}

// --- cart ---

#[tokio::test]
async fn cart_requires_token() {
    let resp = app()
        .oneshot(json_request("GET", "/api/pharmacy/cart", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_lifecycle() {
    let mut app = app().into_service();
    let session = login(&mut app, PATIENT_EMAIL).await;
    let token = Some(session.token.as_str());

    // add two paracetamol
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/pharmacy/cart/add",
            token,
            r#"{"medicine_id":1,"quantity":2}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Cart = body_json(resp).await;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total, 50.0);

    // add one amoxicillin with the default quantity
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/pharmacy/cart/add", token, r#"{"medicine_id":2}"#))
        .await
        .unwrap();
    let cart: Cart = body_json(resp).await;
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total, 90.5);

    // adding more paracetamol merges into the existing line
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/pharmacy/cart/add",
            token,
            r#"{"medicine_id":1,"quantity":1}"#,
        ))
        .await
        .unwrap();
    let cart: Cart = body_json(resp).await;
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.items[0].quantity, 3);

    // out of stock
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/pharmacy/cart/add", token, r#"{"medicine_id":3}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // unknown medicine
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/pharmacy/cart/add", token, r#"{"medicine_id":99}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // view
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("GET", "/api/pharmacy/cart", token, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Cart = body_json(resp).await;
    assert_eq!(cart.total, 115.5);
}

#[tokio::test]
async fn cart_quantity_overflow_is_rejected() {
    let mut app = app().into_service();
    let session = login(&mut app, PATIENT_EMAIL).await;
    let token = Some(session.token.as_str());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/pharmacy/cart/add", token, r#"{"medicine_id":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // 1 + u32::MAX wraps to 0 without a checked add
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/pharmacy/cart/add",
            token,
            r#"{"medicine_id":1,"quantity":4294967295}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Message = body_json(resp).await;
    assert_eq!(body.message, "Insufficient stock");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("GET", "/api/pharmacy/cart", token, ""))
        .await
        .unwrap();
    let cart: Cart = body_json(resp).await;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 1);
    assert_eq!(cart.total, 25.0);
}

// --- admin ---

#[tokio::test]
async fn delete_user_requires_admin() {
    let mut app = app().into_service();
    let session = login(&mut app, DOCTOR_EMAIL).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("DELETE", "/api/admin/users/3", Some(&session.token), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_deletes_user_and_revokes_sessions() {
    let mut app = app().into_service();
    let admin = login(&mut app, ADMIN_EMAIL).await;
    let patient = login(&mut app, PATIENT_EMAIL).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "DELETE",
            &format!("/api/admin/users/{}", patient.user_id),
            Some(&admin.token),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let msg: Message = body_json(resp).await;
    assert_eq!(msg.message, "User deleted");

    // the patient's token no longer resolves
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("GET", "/api/auth/me", Some(&patient.token), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // deleting again is a 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "DELETE",
            &format!("/api/admin/users/{}", patient.user_id),
            Some(&admin.token),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // admins cannot delete themselves
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "DELETE",
            &format!("/api/admin/users/{}", admin.user_id),
            Some(&admin.token),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
