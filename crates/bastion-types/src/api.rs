use serde::{Deserialize, Serialize};

// -- Forms --
//
// Browser forms post urlencoded bodies; every field defaults to empty so a
// missing field fails validation instead of the extractor.

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pw: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountForm {
    #[serde(default, rename = "userName")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "passwordRepeat")]
    pub password_repeat: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub age: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub age: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAdminForm {
    #[serde(default, rename = "userName")]
    pub username: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: Option<String>,
}

// -- Friends --

#[derive(Debug, Default, Deserialize)]
pub struct AddFriendQuery {
    #[serde(default, rename = "otherId")]
    pub other_id: Option<String>,
    #[serde(default, rename = "otherName")]
    pub other_name: Option<String>,
}

// -- Forum --

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub message: String,
}

// -- Responses --

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    #[serde(rename = "personId")]
    pub person_id: i64,
}
