//! In-memory stand-in for the hospital portal backend.
//!
//! Serves the handful of `/api` routes the portal client exercises, with
//! bearer-token sessions issued by `/api/auth/login`. State lives behind a
//! single `RwLock` and starts from a fixed seed on every `app()` call.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Password shared by every seeded account.
pub const DEMO_PASSWORD: &str = "password123";

pub const ADMIN_EMAIL: &str = "admin@hospital.test";
pub const DOCTOR_EMAIL: &str = "doctor@hospital.test";
pub const PATIENT_EMAIL: &str = "patient@hospital.test";
pub const PHARMACIST_EMAIL: &str = "pharmacist@hospital.test";

pub const DEPARTMENTS: &[&str] = &[
    "Cardiology",
    "General Medicine",
    "Neurology",
    "Orthopedics",
    "Pediatrics",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub role: String,
    #[serde(skip)]
    password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub medicine_id: u64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub user_id: u64,
}

#[derive(Deserialize)]
pub struct AddToCart {
    pub medicine_id: u64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug)]
pub struct Portal {
    users: HashMap<u64, User>,
    sessions: HashMap<String, u64>,
    medicines: Vec<Medicine>,
    carts: HashMap<u64, Vec<CartItem>>,
}

impl Portal {
    fn seeded() -> Self {
        let users = [
            (1, ADMIN_EMAIL, "admin"),
            (2, DOCTOR_EMAIL, "doctor"),
            (3, PATIENT_EMAIL, "patient"),
            (4, PHARMACIST_EMAIL, "pharmacist"),
        ]
        .into_iter()
        .map(|(id, email, role)| {
            let user = User {
                id,
                email: email.to_string(),
                role: role.to_string(),
                password: DEMO_PASSWORD.to_string(),
            };
            (id, user)
        })
        .collect();

        let medicines = vec![
            Medicine {
                id: 1,
                name: "Paracetamol 500mg".to_string(),
                price: 25.0,
                stock: 100,
            },
            Medicine {
                id: 2,
                name: "Amoxicillin 250mg".to_string(),
                price: 40.5,
                stock: 20,
            },
            Medicine {
                id: 3,
                name: "Cetirizine 10mg".to_string(),
                price: 12.0,
                stock: 0,
            },
        ];

        Self {
            users,
            sessions: HashMap::new(),
            medicines,
            carts: HashMap::new(),
        }
    }
}

pub type Db = Arc<RwLock<Portal>>;

type Rejection = (StatusCode, Json<Message>);

fn reject(status: StatusCode, message: &str) -> Rejection {
    (
        status,
        Json(Message {
            message: message.to_string(),
        }),
    )
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Portal::seeded()));
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/patient/departments", get(departments))
        .route("/api/pharmacy/medicines", get(medicines))
        .route("/api/pharmacy/cart", get(view_cart))
        .route("/api/pharmacy/cart/add", post(add_to_cart))
        .route("/api/admin/users/{id}", delete(delete_user))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Resolve the bearer token in `headers` to a signed-in user.
fn authenticate(portal: &Portal, headers: &HeaderMap) -> Result<User, Rejection> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Missing token"))?;

    portal
        .sessions
        .get(token)
        .and_then(|id| portal.users.get(id))
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Invalid token"))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Rejection> {
    let mut portal = db.write().await;
    let user = portal
        .users
        .values()
        .find(|u| u.email == input.email && u.password == input.password)
        .cloned()
        .ok_or_else(|| {
            warn!(email = %input.email, "rejected login");
            reject(StatusCode::UNAUTHORIZED, "Invalid credentials")
        })?;

    let token = Uuid::new_v4().to_string();
    portal.sessions.insert(token.clone(), user.id);
    info!(user_id = user.id, role = %user.role, "issued session token");
    Ok(Json(LoginResponse {
        token,
        role: user.role,
        user_id: user.id,
    }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<User>, Rejection> {
    let portal = db.read().await;
    authenticate(&portal, &headers).map(Json)
}

async fn departments() -> Json<Vec<&'static str>> {
    Json(DEPARTMENTS.to_vec())
}

async fn medicines(State(db): State<Db>) -> Json<Vec<Medicine>> {
    Json(db.read().await.medicines.clone())
}

fn cart_of(portal: &Portal, user_id: u64) -> Cart {
    let items = portal.carts.get(&user_id).cloned().unwrap_or_default();
    let total = items.iter().map(|i| i.price * f64::from(i.quantity)).sum();
    Cart { items, total }
}

async fn view_cart(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Cart>, Rejection> {
    let portal = db.read().await;
    let user = authenticate(&portal, &headers)?;
    Ok(Json(cart_of(&portal, user.id)))
}

async fn add_to_cart(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<AddToCart>,
) -> Result<Json<Cart>, Rejection> {
    let mut portal = db.write().await;
    let user = authenticate(&portal, &headers)?;
    if input.quantity == 0 {
        return Err(reject(StatusCode::BAD_REQUEST, "Quantity must be at least 1"));
    }
    let medicine = portal
        .medicines
        .iter()
        .find(|m| m.id == input.medicine_id)
        .cloned()
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Medicine not found"))?;

    let cart = portal.carts.entry(user.id).or_default();
    let in_cart = cart
        .iter()
        .find(|i| i.medicine_id == medicine.id)
        .map(|i| i.quantity)
        .unwrap_or(0);
    let wanted = in_cart
        .checked_add(input.quantity)
        .filter(|wanted| *wanted <= medicine.stock)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Insufficient stock"))?;
    match cart.iter_mut().find(|i| i.medicine_id == medicine.id) {
        Some(item) => item.quantity = wanted,
        None => cart.push(CartItem {
            medicine_id: medicine.id,
            name: medicine.name,
            price: medicine.price,
            quantity: input.quantity,
        }),
    }
    Ok(Json(cart_of(&portal, user.id)))
}

async fn delete_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Message>, Rejection> {
    let mut portal = db.write().await;
    let caller = authenticate(&portal, &headers)?;
    if caller.role != "admin" {
        return Err(reject(StatusCode::FORBIDDEN, "Admin access required"));
    }
    if caller.id == id {
        return Err(reject(StatusCode::BAD_REQUEST, "Cannot delete your own account"));
    }
    portal
        .users
        .remove(&id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "User not found"))?;
    portal.sessions.retain(|_, user_id| *user_id != id);
    portal.carts.remove(&id);
    info!(user_id = id, "deleted user");
    Ok(Json(Message {
        message: "User deleted".to_string(),
    }))
}
