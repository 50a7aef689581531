use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use bastion_api::csrf::CSRF_HEADER;
use bastion_api::session::MemorySessionStore;
use bastion_api::{AppStateInner, SessionOptions, router};
use bastion_db::{Database, PoolOptions};

const PASSWORD: &str = "correct-horse";

struct TestApp {
    app: Router,
    db: Database,
    sessions: MemorySessionStore,
    _dir: TempDir,
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `name=value` part of the Set-Cookie header.
    fn cookie_pair(&self) -> Option<String> {
        self.set_cookie
            .as_deref()
            .and_then(|c| c.split(';').next())
            .map(str::to_owned)
    }
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db"), PoolOptions::default()).unwrap();
        let state = AppStateInner::new(
            db.clone(),
            SessionOptions {
                secure: false,
                ..SessionOptions::default()
            },
        );
        let sessions = state.sessions.clone();
        Self {
            app: router(state),
            db,
            sessions,
            _dir: dir,
        }
    }

    async fn send(&self, req: Request<Body>) -> Reply {
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec();
        Reply {
            status,
            set_cookie,
            body,
        }
    }

    /// A fresh client holding a session cookie and its CSRF token.
    async fn browser(&self) -> Browser<'_> {
        let reply = self
            .send(Request::get("/api/csrfToken").body(Body::empty()).unwrap())
            .await;
        assert_eq!(reply.status, StatusCode::OK);

        Browser {
            app: self,
            cookie: reply.cookie_pair().expect("session cookie"),
            csrf: reply.json()["token"].as_str().unwrap().to_string(),
        }
    }

    /// Create an account and return a browser logged in as it.
    async fn user(&self, username: &str) -> (Browser<'_>, i64) {
        let mut browser = self.browser().await;
        let person_id = browser.sign_up(username).await;
        let reply = browser.login(username, PASSWORD).await;
        assert_eq!(reply.status, StatusCode::OK);
        (browser, person_id)
    }

    async fn admin(&self, username: &str) -> (Browser<'_>, i64) {
        let mut browser = self.browser().await;
        let person_id = browser.sign_up(username).await;
        self.db.promote(username).unwrap();
        let reply = browser.login(username, PASSWORD).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["isAdmin"], true);
        (browser, person_id)
    }
}

struct Browser<'a> {
    app: &'a TestApp,
    cookie: String,
    csrf: String,
}

impl Browser<'_> {
    async fn get(&self, uri: &str) -> Reply {
        self.app
            .send(
                Request::get(uri)
                    .header(header::COOKIE, &self.cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
    }

    /// Urlencoded form post; `_csrf` is appended when `with_csrf` is set.
    async fn post_form(&self, uri: &str, fields: &[(&str, &str)], with_csrf: bool) -> Reply {
        let mut fields = fields.to_vec();
        if with_csrf {
            fields.push(("_csrf", &self.csrf));
        }

        self.app
            .send(
                Request::post(uri)
                    .header(header::COOKIE, &self.cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(serde_urlencoded::to_string(&fields).unwrap()))
                    .unwrap(),
            )
            .await
    }

    /// Programmatic call; the token travels in the CSRF header when given.
    async fn post_api(&self, uri: &str, body: Option<Value>, csrf: Option<&str>) -> Reply {
        let mut req = Request::post(uri).header(header::COOKIE, &self.cookie);
        if let Some(token) = csrf {
            req = req.header(CSRF_HEADER, token);
        }
        let body = match body {
            Some(value) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.app.send(req.body(body).unwrap()).await
    }

    async fn sign_up(&self, username: &str) -> i64 {
        let reply = self
            .post_form(
                "/api/createAccount",
                &[
                    ("userName", username),
                    ("password", PASSWORD),
                    ("passwordRepeat", PASSWORD),
                    ("name", username),
                    ("mail", "someone@example.com"),
                    ("age", "33"),
                ],
                true,
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.json()["personId"].as_i64().unwrap()
    }

    async fn login(&mut self, username: &str, password: &str) -> Reply {
        let reply = self
            .post_form("/api/login", &[("user", username), ("pw", password)], true)
            .await;
        if let Some(cookie) = reply.cookie_pair() {
            self.cookie = cookie;
        }
        reply
    }
}

#[tokio::test]
async fn session_cookie_is_http_only_and_same_site() {
    let app = TestApp::new();
    let reply = app
        .send(Request::get("/api/csrfToken").body(Body::empty()).unwrap())
        .await;

    assert_eq!(reply.status, StatusCode::OK);

    let cookie = reply.set_cookie.unwrap();
    assert!(cookie.starts_with("sid="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(!cookie.contains("Secure"));
    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn anonymous_reads_store_no_session() {
    let app = TestApp::new();

    for uri in ["/api/messages", "/api/ownInfo", "/api/messages"] {
        let reply = app.send(Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.set_cookie.is_none(), "{uri}");
    }

    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn submitted_person_is_stored_literally() {
    let app = TestApp::new();
    let (alice, _) = app.user("alice").await;
    let hostile = "Robert'); DROP TABLE person; --";

    let reply = alice
        .post_form(
            "/api/submitform",
            &[("name", hostile), ("mail", "bobby@example.com"), ("age", "12")],
            true,
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    // Stored exactly as typed; escaped only on the way out.
    let stored = app.db.list_persons().unwrap();
    assert_eq!(stored.iter().filter(|p| p.name == hostile).count(), 1);

    let listing = alice.get("/listdata").await;
    assert_eq!(listing.status, StatusCode::OK);
    let rows = listing.json();
    let escaped = html_escape::encode_safe(hostile).into_owned();
    let matching: Vec<&Value> = rows
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["name"] == escaped.as_str())
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0]["mail"], "bobby@example.com");
    assert_eq!(matching[0]["age"], 12);
    assert_eq!(app.db.count_persons().unwrap(), 2);
}

#[tokio::test]
async fn create_account_is_atomic() {
    let app = TestApp::new();
    let browser = app.browser().await;
    browser.sign_up("alice").await;
    let before = app.db.count_persons().unwrap();

    let duplicate = browser
        .post_form(
            "/api/createAccount",
            &[
                ("userName", "alice"),
                ("password", PASSWORD),
                ("passwordRepeat", PASSWORD),
                ("name", "Impostor"),
                ("mail", "impostor@example.com"),
                ("age", "40"),
            ],
            true,
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.db.count_persons().unwrap(), before);

    let mismatch = browser
        .post_form(
            "/api/createAccount",
            &[
                ("userName", "carol"),
                ("password", PASSWORD),
                ("passwordRepeat", "something-else"),
                ("name", "Carol"),
                ("mail", "carol@example.com"),
                ("age", ""),
            ],
            true,
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);

    let short = browser
        .post_form(
            "/api/createAccount",
            &[
                ("userName", "carol"),
                ("password", "short"),
                ("passwordRepeat", "short"),
                ("name", "Carol"),
                ("mail", "carol@example.com"),
                ("age", ""),
            ],
            true,
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.db.count_persons().unwrap(), before);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();
    let mut browser = app.browser().await;
    let person_id = browser.sign_up("alice").await;

    let wrong_password = browser.login("alice", "not-the-password").await;
    let unknown_user = browser.login("mallory", PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::FORBIDDEN);
    assert_eq!(unknown_user.status, StatusCode::FORBIDDEN);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(browser.get("/api/ownInfo").await.json(), Value::Null);

    let ok = browser.login("alice", PASSWORD).await;
    assert_eq!(ok.status, StatusCode::OK);
    let auth = ok.json();
    assert_eq!(auth["id"], person_id);
    assert_eq!(auth["userName"], "alice");
    assert_eq!(auth["isAdmin"], false);

    assert_eq!(browser.get("/api/ownInfo").await.json(), auth);
}

#[tokio::test]
async fn login_rotates_the_session_cookie() {
    let app = TestApp::new();
    let mut browser = app.browser().await;
    browser.sign_up("alice").await;
    let before = browser.cookie.clone();

    browser.login("alice", PASSWORD).await;
    assert_ne!(browser.cookie, before);

    // The pre-login id no longer names a session.
    let stale = app
        .send(
            Request::get("/api/ownInfo")
                .header(header::COOKIE, &before)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(stale.json(), Value::Null);
}

#[tokio::test]
async fn add_friend_is_idempotent() {
    let app = TestApp::new();
    let (alice, alice_id) = app.user("alice").await;
    let (bob, bob_id) = app.user("bob").await;
    let (admin, _) = app.admin("root").await;

    for _ in 0..2 {
        let reply = alice
            .post_api("/api/addFriend?otherName=bob", None, Some(&alice.csrf))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json(), Value::Bool(true));
    }

    let reverse = bob
        .post_api(
            &format!("/api/addFriend?otherId={alice_id}"),
            None,
            Some(&bob.csrf),
        )
        .await;
    assert_eq!(reverse.status, StatusCode::OK);

    assert_eq!(app.db.count_friends(alice_id).unwrap(), 1);

    let count = admin.get(&format!("/api/countFriends/{alice_id}")).await;
    assert_eq!(count.status, StatusCode::OK);
    assert_eq!(count.json(), json!(1));

    let friends = alice.get("/api/getFriends").await.json();
    assert_eq!(friends.as_array().unwrap().len(), 1);
    assert_eq!(friends[0]["id"], bob_id);

    let of_bob = admin.get(&format!("/api/getFriends/{bob_id}")).await.json();
    assert_eq!(of_bob[0]["id"], alice_id);
}

#[tokio::test]
async fn add_friend_rejects_bad_targets() {
    let app = TestApp::new();
    let (alice, alice_id) = app.user("alice").await;

    for uri in [
        "/api/addFriend?otherName=ghost".to_string(),
        "/api/addFriend?otherId=1%20OR%201%3D1".to_string(),
        "/api/addFriend?otherId=999999".to_string(),
        format!("/api/addFriend?otherId={alice_id}"),
        "/api/addFriend".to_string(),
    ] {
        let reply = alice.post_api(&uri, None, Some(&alice.csrf)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(!reply.text().contains("ghost"));
    }

    assert_eq!(app.db.count_friends(alice_id).unwrap(), 0);
}

#[tokio::test]
async fn forum_messages_are_escaped() {
    let app = TestApp::new();
    let (alice, _) = app.user("alice").await;

    let posted = alice
        .post_api(
            "/api/addMessage",
            Some(json!({ "message": "<script>x</script>" })),
            Some(&alice.csrf),
        )
        .await;
    assert_eq!(posted.status, StatusCode::CREATED);
    let escaped = html_escape::encode_safe("<script>x</script>").into_owned();
    let post = posted.json();
    assert_eq!(post["username"], "alice");
    assert_eq!(post["message"], escaped.as_str());

    let second = alice
        .post_api(
            "/api/addMessage",
            Some(json!({ "message": "second" })),
            Some(&alice.csrf),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED);

    // Public listing, oldest first.
    let anonymous = app.browser().await;
    let listing = anonymous.get("/api/messages").await;
    assert_eq!(listing.status, StatusCode::OK);
    assert!(!listing.text().contains("<script>"));
    let messages = listing.json();
    assert_eq!(messages[0]["id"], post["id"]);
    assert_eq!(messages[0]["message"], escaped.as_str());
    assert_eq!(messages[1]["message"], "second");

    let empty = alice
        .post_api(
            "/api/addMessage",
            Some(json!({ "message": "   " })),
            Some(&alice.csrf),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_without_csrf_token_change_nothing() {
    let app = TestApp::new();
    let (alice, alice_id) = app.user("alice").await;
    app.user("bob").await;
    let persons_before = app.db.count_persons().unwrap();

    let no_header = alice
        .post_api("/api/addFriend?otherName=bob", None, None)
        .await;
    let wrong_header = alice
        .post_api("/api/addFriend?otherName=bob", None, Some("forged"))
        .await;
    assert_eq!(no_header.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_header.status, StatusCode::UNAUTHORIZED);
    assert_eq!(no_header.body, wrong_header.body);
    assert_eq!(app.db.count_friends(alice_id).unwrap(), 0);

    let message = alice
        .post_api("/api/addMessage", Some(json!({ "message": "hi" })), None)
        .await;
    assert_eq!(message.status, StatusCode::UNAUTHORIZED);
    assert!(app.db.list_forum_posts().unwrap().is_empty());

    let person = alice
        .post_form(
            "/api/submitform",
            &[("name", "Eve"), ("mail", "eve@example.com"), ("age", "20")],
            false,
        )
        .await;
    assert_eq!(person.status, StatusCode::UNAUTHORIZED);

    let account = alice
        .post_form(
            "/api/createAccount",
            &[
                ("userName", "eve"),
                ("password", PASSWORD),
                ("passwordRepeat", PASSWORD),
                ("name", "Eve"),
                ("mail", "eve@example.com"),
                ("age", "20"),
            ],
            false,
        )
        .await;
    assert_eq!(account.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.db.count_persons().unwrap(), persons_before);

    // A token from another session does not transfer.
    let other = app.browser().await;
    let stolen = alice
        .post_api("/api/addFriend?otherName=bob", None, Some(&other.csrf))
        .await;
    assert_eq!(stolen.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.db.count_friends(alice_id).unwrap(), 0);
}

#[tokio::test]
async fn admin_promotion_without_csrf_token_changes_nothing() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root").await;
    app.user("alice").await;

    let reply = admin
        .post_form("/api/createAdmin", &[("userName", "alice")], false)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let forged = admin
        .post_form(
            "/api/createAdmin",
            &[("userName", "alice"), ("_csrf", "forged")],
            false,
        )
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let alice = app.db.find_login("alice").unwrap().unwrap();
    assert!(!alice.is_admin);
}

#[tokio::test]
async fn form_routes_reject_missing_token_before_reading_the_body() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root").await;
    let persons_before = app.db.count_persons().unwrap();

    for uri in [
        "/api/createAccount",
        "/api/login",
        "/api/submitform",
        "/api/createAdmin",
    ] {
        // A JSON body is not a form; without a token that is still a 401.
        let no_token = admin.post_api(uri, Some(json!({})), None).await;
        assert_eq!(no_token.status, StatusCode::UNAUTHORIZED, "{uri}");

        let forged = admin.post_api(uri, Some(json!({})), Some("forged")).await;
        assert_eq!(forged.status, StatusCode::UNAUTHORIZED, "{uri}");

        // With the header token the body itself is what gets rejected.
        let bad_body = admin.post_api(uri, Some(json!({})), Some(&admin.csrf)).await;
        assert_eq!(bad_body.status, StatusCode::BAD_REQUEST, "{uri}");
    }

    assert_eq!(app.db.count_persons().unwrap(), persons_before);
}

#[tokio::test]
async fn markup_never_reaches_the_renderer() {
    let app = TestApp::new();
    let browser = app.browser().await;
    let persons_before = app.db.count_persons().unwrap();

    let rejected = browser
        .post_form(
            "/api/createAccount",
            &[
                ("userName", "<script>x</script>"),
                ("password", PASSWORD),
                ("passwordRepeat", PASSWORD),
                ("name", "Mallory"),
                ("mail", "mallory@example.com"),
                ("age", ""),
            ],
            true,
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.db.count_persons().unwrap(), persons_before);

    // Person fields are free text, so they are accepted and escaped on output.
    let created = browser
        .post_form(
            "/api/createAccount",
            &[
                ("userName", "mallory"),
                ("password", PASSWORD),
                ("passwordRepeat", PASSWORD),
                ("name", "<script>x</script>"),
                ("mail", "<img src=x onerror=alert(1)>"),
                ("age", ""),
            ],
            true,
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let mut mallory = browser;
    let login = mallory.login("mallory", PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(!login.text().contains('<'));

    let posted = mallory
        .post_api(
            "/api/addMessage",
            Some(json!({ "message": "hello" })),
            Some(&mallory.csrf),
        )
        .await;
    assert_eq!(posted.status, StatusCode::CREATED);

    let (alice, _) = app.user("alice").await;
    let submitted = alice
        .post_form(
            "/api/submitform",
            &[("name", "<script>y</script>"), ("mail", "y@example.com"), ("age", "")],
            true,
        )
        .await;
    assert_eq!(submitted.status, StatusCode::CREATED);
    assert!(!submitted.text().contains('<'));

    let added = alice
        .post_api("/api/addFriend?otherName=mallory", None, Some(&alice.csrf))
        .await;
    assert_eq!(added.status, StatusCode::OK);

    for uri in ["/api/ownInfo", "/api/messages", "/listdata", "/api/getFriends"] {
        let reply = alice.get(uri).await;
        assert_eq!(reply.status, StatusCode::OK, "{uri}");
        assert!(!reply.text().contains('<'), "{uri}: {}", reply.text());
    }
    assert!(!mallory.get("/api/ownInfo").await.text().contains('<'));
}

#[tokio::test]
async fn login_requires_csrf_token() {
    let app = TestApp::new();
    let browser = app.browser().await;
    browser.sign_up("alice").await;

    let reply = browser
        .post_form("/api/login", &[("user", "alice"), ("pw", PASSWORD)], false)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(browser.get("/api/ownInfo").await.json(), Value::Null);
}

#[tokio::test]
async fn admin_routes_reject_everyone_else_alike() {
    let app = TestApp::new();
    let (alice, alice_id) = app.user("alice").await;
    let anonymous = app.browser().await;

    for uri in [
        format!("/api/getFriends/{alice_id}"),
        format!("/api/countFriends/{alice_id}"),
        "/tabledata/person".to_string(),
    ] {
        let as_user = alice.get(&uri).await;
        let as_anonymous = anonymous.get(&uri).await;
        assert_eq!(as_user.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(as_anonymous.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(as_user.body, as_anonymous.body);
    }

    assert_eq!(
        anonymous.get("/api/getFriends").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(anonymous.get("/listdata").await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_ids_are_rejected_before_the_store() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root").await;

    for uri in [
        "/api/getFriends/abc",
        "/api/getFriends/-1",
        "/api/getFriends/2147483648",
        "/api/countFriends/1%20OR%201%3D1",
        "/api/countFriends/1.0",
    ] {
        let reply = admin.get(uri).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn table_dump_is_admin_only_and_checked() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root").await;

    let users = admin.get("/tabledata/user").await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.json()[0]["username"], "root");
    assert!(!users.text().contains("argon2"));

    let unknown = admin.get("/tabledata/person%3B%20DROP%20TABLE%20person").await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert!(!unknown.text().contains("DROP"));
    assert_eq!(app.db.count_persons().unwrap(), 1);
}

#[tokio::test]
async fn create_admin_promotes_existing_accounts_only() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root").await;
    let (mut alice, _) = app.user("alice").await;

    let denied = alice
        .post_form("/api/createAdmin", &[("userName", "alice")], true)
        .await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let unknown = admin
        .post_form("/api/createAdmin", &[("userName", "ghost")], true)
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let promoted = admin
        .post_form("/api/createAdmin", &[("userName", "alice")], true)
        .await;
    assert_eq!(promoted.status, StatusCode::OK);

    // The flag is read at login.
    let relogin = alice.login("alice", PASSWORD).await;
    assert_eq!(relogin.json()["isAdmin"], true);
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let app = TestApp::new();
    let (alice, _) = app.user("alice").await;

    let reply = alice.post_api("/api/logout", None, Some(&alice.csrf)).await;
    assert_eq!(reply.status, StatusCode::OK);

    assert_eq!(alice.get("/api/ownInfo").await.json(), Value::Null);
    assert_eq!(
        alice.get("/api/getFriends").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn reset_db_requires_admin_and_csrf() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root").await;
    let (alice, _) = app.user("alice").await;

    let as_user = alice.post_api("/api/resetdb", None, Some(&alice.csrf)).await;
    assert_eq!(as_user.status, StatusCode::UNAUTHORIZED);

    let no_token = admin.post_api("/api/resetdb", None, None).await;
    assert_eq!(no_token.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.db.count_persons().unwrap(), 2);

    let reset = admin.post_api("/api/resetdb", None, Some(&admin.csrf)).await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(app.db.count_persons().unwrap(), 0);
}
