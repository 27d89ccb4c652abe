use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery details captured once at checkout
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_ship_infos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_id: Uuid,
    #[sea_orm(nullable)]
    pub customer_name: Option<String>,
    #[sea_orm(nullable)]
    pub customer_phonenumber: Option<String>,
    pub delivery_address: String,
    #[sea_orm(nullable)]
    pub detail_address: Option<String>,
    #[sea_orm(nullable)]
    pub note: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
