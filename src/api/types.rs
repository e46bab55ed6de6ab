// Normalized domain types and the payload-normalization boundary.
//
// The backend returns loosely-shaped JSON: the same field may appear as
// `user.id`, `userId`, or `id`, amounts arrive as numbers or strings, and
// lists come either at the top level or wrapped under `data`. All of that
// variance is absorbed here, once, at the fetch boundary. Everything past
// this module works with the fixed types below.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Look up a (possibly nested) field by a dot-separated path.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Return the first string found at any of the given paths.
fn first_str(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|p| lookup(value, p).and_then(Value::as_str))
        .map(str::to_string)
}

/// Return the first integer id found at any of the given paths. Accepts
/// numeric ids encoded as strings ("42") as well.
fn first_id(value: &Value, paths: &[&str]) -> Option<i64> {
    paths.iter().find_map(|p| {
        let v = lookup(value, p)?;
        v.as_i64().or_else(|| v.as_str()?.trim().parse().ok())
    })
}

/// Return the first amount found at any of the given paths.
///
/// Amounts sometimes arrive as formatted strings ("₹1,200.50"); non-numeric
/// characters are stripped before parsing, mirroring the server's own
/// tolerance for the field.
fn first_amount(value: &Value, paths: &[&str]) -> Option<f64> {
    paths.iter().find_map(|p| sanitize_amount(lookup(value, p)?))
}

/// Parse an amount out of a JSON number or a loosely formatted string.
pub fn sanitize_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Return the first boolean found at any of the given paths.
fn first_bool(value: &Value, paths: &[&str]) -> Option<bool> {
    paths
        .iter()
        .find_map(|p| lookup(value, p).and_then(Value::as_bool))
}

/// Extract the list out of a response that is either a bare array or an
/// object with the array under `data`.
pub fn data_array(response: &Value) -> Vec<Value> {
    if let Some(arr) = response.as_array() {
        return arr.clone();
    }
    if let Some(arr) = response.get("data").and_then(Value::as_array) {
        return arr.clone();
    }
    Vec::new()
}

/// Extract the single object out of a response that is either the object
/// itself or has it wrapped under `data`.
pub fn data_object(response: &Value) -> Value {
    match response.get("data") {
        Some(inner) if !inner.is_null() => inner.clone(),
        _ => response.clone(),
    }
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A committee member eligible (or not) for a draw. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Whether this member already won a prior draw cycle.
    pub is_draw_completed: bool,
}

impl Candidate {
    pub fn from_value(v: &Value) -> Self {
        Candidate {
            id: first_id(v, &["user.id", "userId", "id"]),
            name: first_str(v, &["user.name", "memberName", "name"]),
            phone: first_str(v, &["user.phoneNo", "phone", "phoneNo"]),
            email: first_str(v, &["user.email", "email"]),
            is_draw_completed: first_bool(v, &["user.isUserDrawCompleted", "isUserDrawCompleted"])
                .unwrap_or(false),
        }
    }

    /// Display name, with a dash placeholder when the record has none.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("—")
    }
}

/// The server's authoritative selection for one lottery invocation.
/// Immutable for the lifetime of one reveal session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawWinner {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl DrawWinner {
    pub fn from_value(v: &Value) -> Self {
        DrawWinner {
            id: first_id(v, &["id", "userId", "user.id"]),
            name: first_str(v, &["name", "user.name", "userName"]),
            phone: first_str(v, &["phoneNo", "phone", "user.phoneNo"]),
            email: first_str(v, &["email", "user.email"]),
        }
    }
}

/// A rotating-savings group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    pub id: i64,
    pub name: String,
    pub amount: Option<f64>,
    pub max_members: Option<i64>,
    pub no_of_months: Option<i64>,
    pub fine_amount: Option<f64>,
    pub extra_days_for_fine: Option<i64>,
    pub start_date: Option<String>,
    pub created_at: Option<String>,
    pub status: String,
}

impl Committee {
    /// Returns `None` when the record carries no usable id; such rows are
    /// dropped at the boundary rather than guessed at.
    pub fn from_value(v: &Value) -> Option<Self> {
        let id = first_id(v, &["id", "committeeId"])?;
        Some(Committee {
            id,
            name: first_str(v, &["committeeName", "title", "name"])
                .unwrap_or_else(|| "Untitled committee".to_string()),
            amount: first_amount(v, &["committeeAmount", "amount", "budget"]),
            max_members: first_id(v, &["commissionMaxMember", "maxMembers", "members"]),
            no_of_months: first_id(v, &["noOfMonths"]),
            fine_amount: first_amount(v, &["fineAmount"]),
            extra_days_for_fine: first_id(v, &["extraDaysForFine"]),
            start_date: first_str(v, &["startCommitteeDate", "startDate"]),
            created_at: first_str(v, &["createdAt"]),
            status: first_str(v, &["committeeStatus", "status", "state"])
                .unwrap_or_else(|| "INACTIVE".to_string()),
        })
    }
}

/// One scheduled payout/selection event within a committee's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub id: i64,
    pub date: Option<String>,
    pub time: Option<String>,
    pub min_amount: Option<f64>,
    pub amount: Option<f64>,
}

impl Draw {
    pub fn from_value(v: &Value) -> Option<Self> {
        let id = first_id(v, &["id", "committeeDrawId", "drawId"])?;
        Some(Draw {
            id,
            date: first_str(v, &["committeeDrawDate", "drawDate", "date"]),
            time: first_str(v, &["committeeDrawTime", "drawTime", "time"]),
            min_amount: first_amount(v, &["committeeDrawMinAmount", "minAmount", "minimumAmount"]),
            amount: first_amount(v, &["committeeDrawsAmount", "committeeDrawAmount", "amount"]),
        })
    }
}

/// Per-member payment status for a single draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidRow {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub draw_amount_paid: Option<f64>,
    pub fine_amount_paid: Option<f64>,
    pub is_draw_completed: bool,
}

impl PaidRow {
    pub fn from_value(v: &Value) -> Self {
        PaidRow {
            user_id: first_id(v, &["user.id", "userId", "id"]),
            name: first_str(v, &["user.name", "memberName", "name"]),
            phone: first_str(v, &["user.phoneNo", "phone", "phoneNo"]),
            draw_amount_paid: first_amount(v, &["user.userDrawAmountPaid", "userDrawAmountPaid"]),
            fine_amount_paid: first_amount(v, &["user.fineAmountPaid", "fineAmountPaid"]),
            is_draw_completed: first_bool(
                v,
                &["user.isUserDrawCompleted", "isUserDrawCompleted", "isDrawCompleted"],
            )
            .unwrap_or(false),
        }
    }

    /// Draw amount plus fine, the "total paid" column.
    pub fn total_paid(&self) -> f64 {
        self.draw_amount_paid.unwrap_or(0.0) + self.fine_amount_paid.unwrap_or(0.0)
    }
}

/// The authenticated administrator's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Profile {
    pub fn from_value(v: &Value) -> Self {
        let v = data_object(v);
        Profile {
            name: first_str(&v, &["name", "user.name"]),
            phone: first_str(&v, &["phoneNo", "phone", "user.phoneNo"]),
            email: first_str(&v, &["email", "user.email"]),
        }
    }
}

/// Pull the access token out of a login response. The server has shipped it
/// under several names over time.
pub fn access_token(response: &Value) -> Option<String> {
    let data = data_object(response);
    first_str(&data, &["accessToken", "access_token", "token", "jwt"])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidate_from_nested_user_shape() {
        let v = json!({
            "user": {
                "id": 7,
                "name": "Asha",
                "phoneNo": "9876543210",
                "email": "asha@example.com",
                "isUserDrawCompleted": true
            }
        });
        let c = Candidate::from_value(&v);
        assert_eq!(c.id, Some(7));
        assert_eq!(c.name.as_deref(), Some("Asha"));
        assert_eq!(c.phone.as_deref(), Some("9876543210"));
        assert_eq!(c.email.as_deref(), Some("asha@example.com"));
        assert!(c.is_draw_completed);
    }

    #[test]
    fn candidate_from_flat_shape_defaults_completed_false() {
        let v = json!({ "userId": "12", "memberName": "Ravi", "phone": "111" });
        let c = Candidate::from_value(&v);
        assert_eq!(c.id, Some(12));
        assert_eq!(c.name.as_deref(), Some("Ravi"));
        assert!(!c.is_draw_completed);
    }

    #[test]
    fn winner_prefers_top_level_id_over_nested() {
        let v = json!({ "id": 3, "user": { "id": 9, "name": "Nested" }, "name": "Top" });
        let w = DrawWinner::from_value(&v);
        assert_eq!(w.id, Some(3));
        assert_eq!(w.name.as_deref(), Some("Top"));
    }

    #[test]
    fn committee_requires_an_id() {
        assert!(Committee::from_value(&json!({ "committeeName": "No id" })).is_none());
        let c = Committee::from_value(&json!({ "id": 1, "committeeName": "Diwali fund" })).unwrap();
        assert_eq!(c.name, "Diwali fund");
        assert_eq!(c.status, "INACTIVE");
    }

    #[test]
    fn draw_amount_aliases_resolve_in_order() {
        let v = json!({ "id": 4, "committeeDrawsAmount": 500, "amount": 100 });
        let d = Draw::from_value(&v).unwrap();
        assert_eq!(d.amount, Some(500.0));

        let v = json!({ "drawId": 5, "amount": "1,250.50" });
        let d = Draw::from_value(&v).unwrap();
        assert_eq!(d.id, 5);
        assert_eq!(d.amount, Some(1250.50));
    }

    #[test]
    fn sanitize_amount_handles_currency_strings() {
        assert_eq!(sanitize_amount(&json!("₹1,200")), Some(1200.0));
        assert_eq!(sanitize_amount(&json!(42.5)), Some(42.5));
        assert_eq!(sanitize_amount(&json!("not a number")), None);
        assert_eq!(sanitize_amount(&json!(null)), None);
    }

    #[test]
    fn data_array_unwraps_both_shapes() {
        let wrapped = json!({ "data": [1, 2, 3] });
        let bare = json!([4, 5]);
        let neither = json!({ "message": "ok" });
        assert_eq!(data_array(&wrapped).len(), 3);
        assert_eq!(data_array(&bare).len(), 2);
        assert!(data_array(&neither).is_empty());
    }

    #[test]
    fn paid_row_total_sums_draw_and_fine() {
        let v = json!({
            "user": { "id": 1, "userDrawAmountPaid": 900, "fineAmountPaid": "50" }
        });
        let row = PaidRow::from_value(&v);
        assert_eq!(row.total_paid(), 950.0);
    }

    #[test]
    fn access_token_tries_known_aliases() {
        assert_eq!(
            access_token(&json!({ "data": { "accessToken": "abc" } })).as_deref(),
            Some("abc")
        );
        assert_eq!(
            access_token(&json!({ "data": { "jwt": "xyz" } })).as_deref(),
            Some("xyz")
        );
        assert!(access_token(&json!({ "data": {} })).is_none());
    }
}
