use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_catalog_tables::Migration),
            Box::new(m20240601_000002_create_cart_tables::Migration),
            Box::new(m20240601_000003_create_order_tables::Migration),
            Box::new(m20240601_000004_create_notifications_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(ColumnDef::new(Stores::OwnerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Stores::Status)
                                .string_len(20)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(
                            ColumnDef::new(Stores::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stores::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Dishes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Dishes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Dishes::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Dishes::Name).string().not_null())
                        .col(ColumnDef::new(Dishes::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(Dishes::StockStatus)
                                .string_len(20)
                                .not_null()
                                .default("AVAILABLE"),
                        )
                        .col(
                            ColumnDef::new(Dishes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Dishes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_dishes_store_id")
                                .from(Dishes::Table, Dishes::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ToppingGroups::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ToppingGroups::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ToppingGroups::StoreId).uuid().not_null())
                        .col(ColumnDef::new(ToppingGroups::Name).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_topping_groups_store_id")
                                .from(ToppingGroups::Table, ToppingGroups::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Toppings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Toppings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Toppings::ToppingGroupId).uuid().not_null())
                        .col(ColumnDef::new(Toppings::Name).string().not_null())
                        .col(ColumnDef::new(Toppings::Price).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_toppings_topping_group_id")
                                .from(Toppings::Table, Toppings::ToppingGroupId)
                                .to(ToppingGroups::Table, ToppingGroups::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Ratings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Ratings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Ratings::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Ratings::UserId).uuid().not_null())
                        .col(ColumnDef::new(Ratings::RatingValue).integer().not_null())
                        .col(
                            ColumnDef::new(Ratings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ratings_store_id")
                                .from(Ratings::Table, Ratings::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dishes_store_id")
                        .table(Dishes::Table)
                        .col(Dishes::StoreId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ratings_store_id")
                        .table(Ratings::Table)
                        .col(Ratings::StoreId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Ratings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Toppings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ToppingGroups::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Dishes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Stores {
        Table,
        Id,
        Name,
        OwnerId,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Dishes {
        Table,
        Id,
        StoreId,
        Name,
        Price,
        StockStatus,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ToppingGroups {
        Table,
        Id,
        StoreId,
        Name,
    }

    #[derive(DeriveIden)]
    enum Toppings {
        Table,
        Id,
        ToppingGroupId,
        Name,
        Price,
    }

    #[derive(DeriveIden)]
    enum Ratings {
        Table,
        Id,
        StoreId,
        UserId,
        RatingValue,
        CreatedAt,
    }
}

mod m20240601_000002_create_cart_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::UserId).uuid().not_null())
                        .col(ColumnDef::new(Carts::StoreId).uuid().not_null())
                        .col(
                            ColumnDef::new(Carts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One cart per (user, store)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_carts_user_store")
                        .table(Carts::Table)
                        .col(Carts::UserId)
                        .col(Carts::StoreId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CartItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::DishId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::DishName).string().not_null())
                        .col(ColumnDef::new(CartItems::Price).decimal().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::Note).text().null())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart_id")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One line per dish within a cart
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_cart_items_cart_dish")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::DishId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItemToppings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItemToppings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItemToppings::CartItemId).uuid().not_null())
                        .col(ColumnDef::new(CartItemToppings::ToppingId).uuid().not_null())
                        .col(ColumnDef::new(CartItemToppings::ToppingName).string().not_null())
                        .col(
                            ColumnDef::new(CartItemToppings::Price)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_item_toppings_cart_item_id")
                                .from(CartItemToppings::Table, CartItemToppings::CartItemId)
                                .to(CartItems::Table, CartItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItemToppings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        StoreId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        DishId,
        DishName,
        Price,
        Quantity,
        Note,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItemToppings {
        Table,
        Id,
        CartItemId,
        ToppingId,
        ToppingName,
        Price,
    }
}

mod m20240601_000003_create_order_tables {
    use super::m20240601_000001_create_catalog_tables::Stores;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Orders::SubtotalPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalDiscount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::ShippingFee)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::FinalTotal).decimal().not_null())
                        .col(ColumnDef::new(Orders::StaffNote).text().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_store_id")
                                .from(Orders::Table, Orders::StoreId)
                                .to(Stores::Table, Stores::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_store_status")
                        .table(Orders::Table)
                        .col(Orders::StoreId)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::DishId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::DishName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Price).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Note).text().null())
                        .col(
                            ColumnDef::new(OrderItems::LineTotal)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItemToppings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItemToppings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItemToppings::OrderItemId).uuid().not_null())
                        .col(ColumnDef::new(OrderItemToppings::ToppingId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderItemToppings::ToppingName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItemToppings::Price)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_item_toppings_order_item_id")
                                .from(OrderItemToppings::Table, OrderItemToppings::OrderItemId)
                                .to(OrderItems::Table, OrderItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderShipInfos::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderShipInfos::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderShipInfos::OrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(OrderShipInfos::CustomerName).string().null())
                        .col(
                            ColumnDef::new(OrderShipInfos::CustomerPhonenumber)
                                .string_len(20)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OrderShipInfos::DeliveryAddress)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderShipInfos::DetailAddress).string().null())
                        .col(ColumnDef::new(OrderShipInfos::Note).text().null())
                        .col(ColumnDef::new(OrderShipInfos::Longitude).double().not_null())
                        .col(ColumnDef::new(OrderShipInfos::Latitude).double().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_ship_infos_order_id")
                                .from(OrderShipInfos::Table, OrderShipInfos::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderShipInfos::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItemToppings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        StoreId,
        Status,
        PaymentMethod,
        PaymentStatus,
        SubtotalPrice,
        TotalDiscount,
        ShippingFee,
        FinalTotal,
        StaffNote,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        DishId,
        DishName,
        Price,
        Quantity,
        Note,
        LineTotal,
    }

    #[derive(DeriveIden)]
    enum OrderItemToppings {
        Table,
        Id,
        OrderItemId,
        ToppingId,
        ToppingName,
        Price,
    }

    #[derive(DeriveIden)]
    enum OrderShipInfos {
        Table,
        Id,
        OrderId,
        CustomerName,
        CustomerPhonenumber,
        DeliveryAddress,
        DetailAddress,
        Note,
        Longitude,
        Latitude,
    }
}

mod m20240601_000004_create_notifications_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_notifications_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                        .col(ColumnDef::new(Notifications::OrderId).uuid().null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::Kind).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Notifications::Status)
                                .string_len(20)
                                .not_null()
                                .default("unread"),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notifications_user_id")
                        .table(Notifications::Table)
                        .col(Notifications::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        UserId,
        OrderId,
        Title,
        Message,
        Kind,
        Status,
        CreatedAt,
    }
}
