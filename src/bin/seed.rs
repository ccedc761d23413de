use cafe_pos_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    models::{MenuSection, ROLE_ADMIN, ROLE_STAFF},
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct SeedItem {
    section: MenuSection,
    name: &'static str,
    /// Cents.
    price: i64,
    category: &'static str,
    description: &'static str,
    inventory: i32,
}

const MENU: &[SeedItem] = &[
    SeedItem { section: MenuSection::Beverages, name: "Espresso", price: 250, category: "Coffee", description: "Strong black coffee", inventory: 50 },
    SeedItem { section: MenuSection::Beverages, name: "Cappuccino", price: 350, category: "Coffee", description: "Coffee with steamed milk foam", inventory: 40 },
    SeedItem { section: MenuSection::Beverages, name: "Latte", price: 400, category: "Coffee", description: "Coffee with steamed milk", inventory: 40 },
    SeedItem { section: MenuSection::Beverages, name: "Green Tea", price: 200, category: "Tea", description: "Fresh green tea", inventory: 30 },
    SeedItem { section: MenuSection::Beverages, name: "Fresh Orange Juice", price: 300, category: "Juice", description: "Freshly squeezed orange juice", inventory: 25 },
    SeedItem { section: MenuSection::Food, name: "Croissant", price: 250, category: "Pastry", description: "Buttery French pastry", inventory: 40 },
    SeedItem { section: MenuSection::Food, name: "Chocolate Muffin", price: 300, category: "Pastry", description: "Rich chocolate muffin", inventory: 35 },
    SeedItem { section: MenuSection::Food, name: "Caesar Salad", price: 850, category: "Salad", description: "Fresh romaine with caesar dressing", inventory: 20 },
    SeedItem { section: MenuSection::Food, name: "Club Sandwich", price: 900, category: "Sandwich", description: "Triple layer sandwich with turkey and bacon", inventory: 30 },
    SeedItem { section: MenuSection::Food, name: "Margherita Pizza", price: 1200, category: "Pizza", description: "Classic pizza with tomato and mozzarella", inventory: 15 },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&pool, "admin", "admin123", ROLE_ADMIN).await?;
    let staff_id = ensure_user(&pool, "staff", "staff123", ROLE_STAFF).await?;
    seed_menu(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Staff ID: {staff_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (username) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // Existing accounts keep their password.
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {username} (role={role})");
    Ok(user_id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for section in MenuSection::ALL {
        let items = MENU.iter().filter(|item| item.section == *section);
        let mut count: i64 = 0;
        for item in items {
            count += 1;
            sqlx::query(
                r#"
                INSERT INTO menu_items
                    (id, section, name, price, category, available, description, inventory)
                VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(section.format_id(count))
            .bind(section.as_str())
            .bind(item.name)
            .bind(Decimal::new(item.price, 2))
            .bind(item.category)
            .bind(item.description)
            .bind(item.inventory)
            .execute(&mut *tx)
            .await?;
        }

        // New items continue after the seeded ids.
        sqlx::query(
            r#"
            INSERT INTO counters (name, value) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET value = GREATEST(counters.value, EXCLUDED.value)
            "#,
        )
        .bind(format!("menu:{}", section.id_prefix()))
        .bind(count)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    println!("Seeded menu ({} items)", MENU.len());
    Ok(())
}
