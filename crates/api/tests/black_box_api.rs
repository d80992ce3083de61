use std::collections::HashMap;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use tritiq_api::config::Settings;
use tritiq_auth::{Claims, Role};
use tritiq_core::OrganizationId;

const SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "root@tritiq.test";
const ADMIN_PASSWORD: &str = "root-password";

struct TestServer {
    base_url: String,
    api: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SECRET_KEY", SECRET),
            ("BOOTSTRAP_ADMIN_EMAIL", ADMIN_EMAIL),
            ("BOOTSTRAP_ADMIN_PASSWORD", ADMIN_PASSWORD),
        ]);
        let settings = Settings::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .expect("test settings");

        // Same router as prod, in-memory stores, ephemeral port.
        let app = tritiq_api::app::build_app(&settings)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api: format!("{base_url}/api/v1"),
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        read(req.send().await.unwrap()).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn platform_token(&self) -> String {
        let (status, body) = self
            .post(
                "/platform/login",
                None,
                json!({ "username": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// License a new organization; returns its id, admin email and admin token.
    async fn tenant(&self, name: &str) -> Tenant {
        let platform = self.platform_token().await;
        let email = format!("admin@{}.test", name.to_lowercase().replace(' ', ""));
        let (status, license) = self
            .post(
                "/organizations/license/create",
                Some(&platform),
                json!({ "organization_name": name, "superadmin_email": email }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{license}");

        let password = license["temp_password"].as_str().unwrap();
        let (status, login) = self
            .post("/auth/login", None, json!({ "username": email, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "{login}");

        Tenant {
            id: license["organization_id"].as_str().unwrap().to_string(),
            subdomain: license["subdomain"].as_str().unwrap().to_string(),
            email,
            password: password.to_string(),
            token: login["access_token"].as_str().unwrap().to_string(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Tenant {
    id: String,
    subdomain: String,
    email: String,
    password: String,
    token: String,
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(sub: Uuid, organization_id: Option<OrganizationId>, role: Role, issued: chrono::DateTime<Utc>) -> String {
    let claims = Claims::new(sub, "ghost@tritiq.test", organization_id, role, issued, ChronoDuration::minutes(10));
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn vendor(name: &str) -> Value {
    json!({
        "name": name,
        "contact_number": "+91-98200-00000",
        "email": "sales@vendor.test",
        "address1": "12 Industrial Estate",
        "city": "Pune",
        "state": "Maharashtra",
        "pin_code": "411001",
        "state_code": "27",
    })
}

fn company() -> Value {
    json!({
        "name": "Acme Tools Pvt Ltd",
        "address1": "Plot 7, MIDC",
        "city": "Pune",
        "state": "Maharashtra",
        "pin_code": "411019",
        "state_code": "27",
        "contact_number": "+91-20-5555-0000",
    })
}

fn product(name: &str, reorder_level: u32) -> Value {
    json!({
        "name": name,
        "unit": "pcs",
        "unit_price": 125.5,
        "gst_rate": 18.0,
        "reorder_level": reorder_level,
    })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/vendors")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    let (status, body) = srv.get("/vendors", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");

    // Well signed, but for an account that does not exist.
    let ghost = mint_jwt(Uuid::now_v7(), Some(OrganizationId::new()), Role::Admin, Utc::now());
    let (status, _) = srv.get("/vendors", &ghost).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(Uuid::now_v7(), None, Role::SuperAdmin, Utc::now() - ChronoDuration::hours(2));
    let (status, _) = srv.get("/platform/me", &expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn license_provisions_organization_and_admin() {
    let srv = TestServer::spawn().await;
    let platform = srv.platform_token().await;

    let (status, license) = srv
        .post(
            "/organizations/license/create",
            Some(&platform),
            json!({ "organization_name": "Acme Tools & Dies", "superadmin_email": "owner@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{license}");
    assert_eq!(license["subdomain"], "acmetoolsdies");

    let (status, login) = srv
        .post(
            "/auth/login",
            None,
            json!({ "username": "owner@acme.test", "password": license["temp_password"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{login}");
    assert_eq!(login["token_type"], "bearer");
    assert_eq!(login["user_role"], "org_admin");
    assert_eq!(login["must_change_password"], true);
    assert_eq!(login["is_first_login"], true);
    assert_eq!(login["company_details_completed"], false);
    assert_eq!(login["organization_id"], license["organization_id"]);

    let (status, body) = srv
        .post(
            "/organizations/license/create",
            Some(&platform),
            json!({ "organization_name": "acme tools & dies", "superadmin_email": "other@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Organization name already exists");

    let (status, body) = srv
        .post(
            "/organizations/license/create",
            Some(&platform),
            json!({ "organization_name": "Acme Two", "superadmin_email": "OWNER@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already exists in the system");

    // Subdomain collides with the first license and gets a suffix.
    let (status, third) = srv
        .post(
            "/organizations/license/create",
            Some(&platform),
            json!({ "organization_name": "ACME-Tools-Dies!", "superadmin_email": "third@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{third}");
    assert_eq!(third["subdomain"], "acmetoolsdies1");

    let res = srv
        .client
        .get(srv.url("/organizations/subdomain/acmetoolsdies"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let public: Value = res.json().await.unwrap();
    assert_eq!(public["id"], license["organization_id"]);
}

#[tokio::test]
async fn org_admin_cannot_license_organizations() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, _) = srv
        .post(
            "/organizations/license/create",
            Some(&acme.token),
            json!({ "organization_name": "Sneaky", "superadmin_email": "x@sneaky.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wrong_password_is_rejected_and_locks_after_five_failures() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    for _ in 0..5 {
        let (status, body) = srv
            .post("/auth/login", None, json!({ "username": acme.email, "password": "wrong-password" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Incorrect email/username or password");
    }

    let (status, body) = srv
        .post("/auth/login", None, json!({ "username": acme.email, "password": acme.password }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].as_str().unwrap().contains("locked"), "{body}");
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, body) = srv
        .post(
            "/auth/password/change",
            Some(&acme.token),
            json!({ "current_password": "nope-nope", "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Current password is incorrect");

    let (status, _) = srv
        .post(
            "/auth/password/change",
            Some(&acme.token),
            json!({ "current_password": acme.password, "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, login) = srv
        .post("/auth/login", None, json!({ "username": acme.email, "password": "brand-new-pass" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["must_change_password"], false);
    assert_eq!(login["is_first_login"], false);
}

#[tokio::test]
async fn tenant_isolation_hides_foreign_records() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let globex = srv.tenant("Globex").await;

    let (status, created) = srv.post("/vendors", Some(&acme.token), vendor("Steel Co")).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap();

    let (status, _) = srv.get(&format!("/vendors/{id}"), &globex.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv
        .put(&format!("/vendors/{id}"), &globex.token, json!({ "name": "Hijacked" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv.delete(&format!("/vendors/{id}"), &globex.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = srv.get("/vendors", &globex.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 0);

    // Naming another organization explicitly is refused outright.
    let res = srv
        .client
        .get(srv.url("/vendors"))
        .bearer_auth(&globex.token)
        .header("X-Organization-ID", &acme.id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (status, body) = srv.get(&format!("/vendors/{id}"), &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Steel Co");
}

/// Every tenant-owned record of another organization reads as missing.
#[tokio::test]
async fn foreign_records_of_every_kind_are_not_found() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let globex = srv.tenant("Globex").await;

    let (status, customer) = srv.post("/customers", Some(&acme.token), vendor("Buyer Co")).await;
    assert_eq!(status, StatusCode::CREATED, "{customer}");
    let (status, item) = srv.post("/products", Some(&acme.token), product("Bolt M8", 0)).await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    let (status, company) = srv.post("/companies", Some(&acme.token), company()).await;
    assert_eq!(status, StatusCode::CREATED, "{company}");
    let (status, clerk) = srv
        .post(
            "/users",
            Some(&acme.token),
            json!({ "email": "clerk@acme.test", "username": "clerk", "password": "clerk-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{clerk}");

    let targets = [
        (format!("/customers/{}", customer["id"].as_str().unwrap()), "Customer not found"),
        (format!("/products/{}", item["id"].as_str().unwrap()), "Product not found"),
        (format!("/users/{}", clerk["id"].as_str().unwrap()), "User not found"),
    ];
    for (path, detail) in &targets {
        let (status, body) = srv.get(path, &globex.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {path}");
        assert_eq!(body["detail"], *detail);

        let (status, body) = srv.put(path, &globex.token, json!({ "name": "Hijacked" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "PUT {path}");
        assert_eq!(body["detail"], *detail);

        let (status, body) = srv.delete(path, &globex.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "DELETE {path}");
        assert_eq!(body["detail"], *detail);
    }

    let company_path = format!("/companies/{}", company["id"].as_str().unwrap());
    let (status, body) = srv.put(&company_path, &globex.token, json!({ "name": "Hijacked" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Company not found");
    let (status, _) = srv.get("/companies/current", &globex.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing was touched on the owning side.
    for (path, _) in &targets {
        let (status, body) = srv.get(path, &acme.token).await;
        assert_eq!(status, StatusCode::OK, "GET {path}");
        assert_ne!(body["name"], "Hijacked");
    }
    let (_, list) = srv.get("/users", &globex.token).await;
    assert!(list.as_array().unwrap().iter().all(|u| u["email"] != "clerk@acme.test"));
}

#[tokio::test]
async fn vendor_names_are_unique_and_deletes_need_admin() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, created) = srv.post("/vendors", Some(&acme.token), vendor("Steel Co")).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = srv.post("/vendors", Some(&acme.token), vendor("STEEL CO")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Vendor name already exists");

    let (status, user) = srv
        .post(
            "/users",
            Some(&acme.token),
            json!({
                "email": "clerk@acme.test",
                "username": "clerk",
                "password": "clerk-password",
                "role": "standard_user",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    assert!(user.get("password_hash").is_none());

    let (status, login) = srv
        .post("/auth/login", None, json!({ "username": "clerk", "password": "clerk-password" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let clerk = login["access_token"].as_str().unwrap();

    let (status, _) = srv.post("/vendors", Some(clerk), vendor("Copper Co")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = srv.delete(&format!("/vendors/{id}"), clerk).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.delete(&format!("/vendors/{id}"), &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, active) = srv.get("/vendors", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(active.as_array().unwrap().iter().all(|v| v["id"] != id.as_str()));
    let (status, all) = srv.get("/vendors?active_only=false", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_create_one_record() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let token = Some(acme.token.as_str());

    let (a, b, c, d) = tokio::join!(
        srv.post("/vendors", token, vendor("Steel Co")),
        srv.post("/vendors", token, vendor("Steel Co")),
        srv.post("/vendors", token, vendor("steel co")),
        srv.post("/vendors", token, vendor("STEEL CO")),
    );
    let statuses = [a.0, b.0, c.0, d.0];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count(), 3);

    let (status, all) = srv.get("/vendors", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn users_cannot_escalate_or_delete_themselves() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, user) = srv
        .post(
            "/users",
            Some(&acme.token),
            json!({ "email": "clerk@acme.test", "username": "clerk", "password": "clerk-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let clerk_id = user["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(
            "/users",
            Some(&acme.token),
            json!({ "email": "CLERK@acme.test", "username": "clerk2", "password": "clerk-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");

    let (_, login) = srv
        .post("/auth/login", None, json!({ "username": "clerk@acme.test", "password": "clerk-password" }))
        .await;
    let clerk = login["access_token"].as_str().unwrap();

    let (status, body) = srv
        .put(&format!("/users/{clerk_id}"), clerk, json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Cannot update administrative fields");

    let (status, body) = srv
        .put(&format!("/users/{clerk_id}"), clerk, json!({ "full_name": "Chief Clerk" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Chief Clerk");

    let (_, me) = srv.get("/users/me", &acme.token).await;
    let admin_id = me["id"].as_str().unwrap();
    let (status, body) = srv.delete(&format!("/users/{admin_id}"), &acme.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Cannot delete your own account");
}

#[tokio::test]
async fn platform_accounts_must_select_an_organization() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let platform = srv.platform_token().await;

    let (status, _) = srv.post("/vendors", Some(&acme.token), vendor("Steel Co")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.get("/vendors", &platform).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Super admin must specify organization ID");

    let res = srv
        .client
        .get(srv.url("/vendors"))
        .bearer_auth(&platform)
        .header("X-Organization-ID", &acme.id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, listed) = srv.get(&format!("/org/{}/vendors", acme.id), &platform).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["name"], "Steel Co");

    let (status, _) = srv
        .get(&format!("/org/{}/vendors", OrganizationId::new()), &platform)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.get("/org/not-an-id/vendors", &platform).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn suspended_organizations_cannot_sign_in() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let platform = srv.platform_token().await;

    let (status, _) = srv
        .post(&format!("/settings/organizations/{}/suspend", acme.id), Some(&platform), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = srv
        .post(&format!("/settings/organizations/{}/suspend", acme.id), Some(&platform), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = srv
        .post("/auth/login", None, json!({ "username": acme.email, "password": acme.password }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Organization is not active");

    let res = srv
        .client
        .get(srv.url(&format!("/organizations/subdomain/{}", acme.subdomain)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn company_setup_marks_organization_complete() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, body) = srv.get("/companies/current", &acme.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Company details not found. Please complete company setup.");

    let (status, _) = srv.post("/companies", Some(&acme.token), company()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = srv.post("/companies", Some(&acme.token), company()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Company already exists for this organization");

    let (status, org) = srv.get("/organizations/current", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(org["company_details_completed"], true);
}

#[tokio::test]
async fn stock_adjustments_never_go_negative() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, created) = srv.post("/products", Some(&acme.token), product("Bolt M8", 20)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap();

    let (status, zero) = srv.get(&format!("/stock/product/{id}"), &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(zero["quantity"], 0.0);

    let (status, adjusted) = srv
        .post(
            &format!("/stock/adjust/{id}"),
            Some(&acme.token),
            json!({ "quantity_change": 10.0, "reason": "opening" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{adjusted}");
    assert_eq!(adjusted["previous_quantity"], 0.0);
    assert_eq!(adjusted["new_quantity"], 10.0);

    let (status, body) = srv
        .post(
            &format!("/stock/adjust/{id}"),
            Some(&acme.token),
            json!({ "quantity_change": -15.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Insufficient stock for this adjustment");

    let (status, body) = srv
        .post(
            "/stock",
            Some(&acme.token),
            json!({ "product_id": id, "quantity": 5.0, "unit": "pcs" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Stock entry already exists for this product");

    let (status, low) = srv.get("/stock/low-stock", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low[0]["quantity"], 10.0);
    assert_eq!(low[0]["product_name"], "Bolt M8");

    let globex = srv.tenant("Globex").await;
    let (status, _) = srv.get(&format!("/stock/product/{id}"), &globex.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn voucher_lifecycle() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (_, vendor) = srv.post("/vendors", Some(&acme.token), vendor("Steel Co")).await;
    let (_, product) = srv.post("/products", Some(&acme.token), product("Bolt M8", 0)).await;
    let voucher = json!({
        "voucher_number": "PV-0001",
        "date": "2026-01-15T00:00:00Z",
        "vendor_id": vendor["id"],
        "total_amount": 1180.0,
        "cgst_amount": 90.0,
        "sgst_amount": 90.0,
        "items": [{
            "product_id": product["id"],
            "quantity": 8.0,
            "unit": "pcs",
            "unit_price": 125.0,
            "taxable_amount": 1000.0,
            "gst_rate": 18.0,
            "total_amount": 1180.0,
        }],
    });

    let (status, created) = srv
        .post("/vouchers/purchase-vouchers", Some(&acme.token), voucher.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "draft");
    let path = format!("/vouchers/purchase-vouchers/{}", created["id"].as_str().unwrap());

    let (status, body) = srv
        .post("/vouchers/purchase-vouchers", Some(&acme.token), voucher)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Voucher number already exists");

    let (status, _) = srv.get(&format!("/vouchers/sales-vouchers/{}", created["id"].as_str().unwrap()), &acme.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv.get("/vouchers/not-a-kind", &acme.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, confirmed) = srv.put(&path, &acme.token, json!({ "status": "confirmed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");
    let (status, _) = srv.put(&path, &acme.token, json!({ "status": "draft" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sent) = srv.post(&format!("{path}/send-email"), Some(&acme.token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["message"], "Email queued for sales@vendor.test");

    let (status, _) = srv.put(&path, &acme.token, json!({ "status": "cancelled" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = srv.put(&path, &acme.token, json!({ "notes": "late edit" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Cancelled vouchers cannot be modified");

    let (status, listed) = srv.get("/vouchers/purchase-vouchers?status=cancelled", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let globex = srv.tenant("Globex").await;
    let (status, _) = srv.get(&path, &globex.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv.post(&format!("{path}/send-email"), Some(&globex.token), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vouchers_reject_foreign_counterparties() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let globex = srv.tenant("Globex").await;

    let (_, foreign) = srv.post("/customers", Some(&globex.token), vendor("Globex Buyer")).await;
    let (_, product) = srv.post("/products", Some(&acme.token), product("Bolt M8", 0)).await;

    let (status, body) = srv
        .post(
            "/vouchers/sales-vouchers",
            Some(&acme.token),
            json!({
                "voucher_number": "SV-1",
                "date": "2026-02-01T00:00:00Z",
                "customer_id": foreign["id"],
                "items": [{ "product_id": product["id"], "quantity": 1.0, "unit": "pcs", "unit_price": 10.0 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Customer not found");
}

#[tokio::test]
async fn journal_vouchers_must_balance() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;

    let (status, body) = srv
        .post(
            "/vouchers/journal-vouchers",
            Some(&acme.token),
            json!({
                "voucher_number": "JV-1",
                "date": "2026-03-31T00:00:00Z",
                "entries": [
                    { "account": "Depreciation", "debit": 500.0 },
                    { "account": "Accumulated Depreciation", "credit": 400.0 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Total debits must equal total credits");
}

#[tokio::test]
async fn data_reset_requires_confirmation() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let globex = srv.tenant("Globex").await;
    let platform = srv.platform_token().await;

    srv.post("/vendors", Some(&acme.token), vendor("Steel Co")).await;
    srv.post("/vendors", Some(&globex.token), vendor("Globex Steel")).await;
    let (status, _) = srv.post("/companies", Some(&acme.token), company()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.post("/organizations/reset-data", Some(&acme.token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Confirmation required. Set confirm=true to proceed.");
    let (_, vendors) = srv.get("/vendors", &acme.token).await;
    assert_eq!(vendors.as_array().unwrap().len(), 1);

    // A platform account with no organization selected never wipes everything implicitly.
    let (status, _) = srv
        .post("/organizations/reset-data?confirm=true", Some(&platform), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, vendors) = srv.get("/vendors", &globex.token).await;
    assert_eq!(vendors.as_array().unwrap().len(), 1);

    let (status, body) = srv
        .post("/organizations/reset-data?confirm=true", Some(&acme.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["organizations_reset"], 1);
    assert_eq!(body["deleted"]["vendors"], 1);
    assert_eq!(body["deleted"]["companies"], 1);

    let (_, vendors) = srv.get("/vendors?active_only=false", &acme.token).await;
    assert_eq!(vendors.as_array().unwrap().len(), 0);
    let (_, org) = srv.get("/organizations/current", &acme.token).await;
    assert_eq!(org["company_details_completed"], false);
    let (_, vendors) = srv.get("/vendors", &globex.token).await;
    assert_eq!(vendors.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn entity_reset_is_limited_to_own_organization() {
    let srv = TestServer::spawn().await;
    let acme = srv.tenant("Acme").await;
    let globex = srv.tenant("Globex").await;
    let platform = srv.platform_token().await;
    srv.post("/vendors", Some(&acme.token), vendor("Steel Co")).await;

    let path = format!("/settings/reset/entity?entity_id={}", acme.id);
    let (status, body) = srv.post(&path, Some(&acme.token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Confirmation required. Set confirm=true to proceed.");

    let confirmed = format!("{path}&confirm=true");
    let (status, _) = srv.post(&confirmed, Some(&globex.token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.post(&confirmed, Some(&acme.token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["entity_id"], acme.id.as_str());
    assert_eq!(body["organization_name"], "Acme");
    assert_eq!(body["reset_details"]["vendors"], 1);

    let (status, _) = srv
        .post("/settings/reset/organization?confirm=true", Some(&platform), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let res = srv
        .client
        .post(srv.url("/settings/reset/organization?confirm=true"))
        .bearer_auth(&platform)
        .header("X-Organization-ID", &globex.id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
