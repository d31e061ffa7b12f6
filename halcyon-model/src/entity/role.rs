use crate::id::Id;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Role {
    pub id: Id,
    pub name: String,
    pub position: i64,
    #[serde(default)]
    pub managed: bool,
}
