use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Position {
    #[schema(example = "p-01")]
    pub position_id: String,
    #[schema(example = "Trưởng phòng")]
    pub position_name: String,
}
