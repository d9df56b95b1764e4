//! Sample backend payloads

use serde_json::{Value, json};

/// `POST /login` success body
pub fn login_body() -> Value {
    json!({
        "access_token": "abc.def.ghi",
        "token_type": "bearer",
        "username": "admin",
        "message": "Welcome back, admin",
        "role": "SUPER_ADMIN"
    })
}

/// Two managed users
pub fn users_body() -> Value {
    json!([
        {"id": 1, "username": "alice", "ip_address": "10.0.0.1", "role_name": "ADMIN", "is_active": true},
        {"id": 2, "username": "bob", "ip_address": "10.0.0.2", "role_name": "ANALYST", "is_active": false}
    ])
}

/// Two processors, both active
pub fn processors_body() -> Value {
    json!([
        {"id": "p1", "name": "Stripe main", "kind": "STRIPE", "verified": true, "status": "ACTIVE", "created_at": "2024-01-01T00:00:00Z"},
        {"id": "p2", "name": "NMI backup", "kind": "NMI", "verified": false, "status": "ACTIVE", "created_at": "2024-02-01T00:00:00Z"}
    ])
}

/// Activity log with one entry on each side of 2024-01-01
pub fn activity_body() -> Value {
    json!([
        {"id": 11, "event": "login-success", "username": "admin", "ip_addr": "10.0.0.1", "timestamp": "2024-01-02T00:00:00Z"},
        {"id": 10, "event": "login-failed", "username": null, "ip_addr": "10.0.0.9", "timestamp": "2023-12-31T00:00:00Z"}
    ])
}
