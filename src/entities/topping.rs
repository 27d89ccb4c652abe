use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "toppings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub topping_group_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::topping_group::Entity",
        from = "Column::ToppingGroupId",
        to = "super::topping_group::Column::Id"
    )]
    ToppingGroup,
}

impl Related<super::topping_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ToppingGroup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
