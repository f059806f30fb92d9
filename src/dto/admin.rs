use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::Role,
    models::{AuditEntry, Employee, User},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardCounts {
    pub products: i64,
    pub orders: i64,
    pub customers: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EmployeeList {
    #[schema(value_type = Vec<Employee>)]
    pub items: Vec<Employee>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AuditList {
    #[schema(value_type = Vec<AuditEntry>)]
    pub items: Vec<AuditEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRoleRequest {
    pub role: Role,
}
