//! # Demo Day
//!
//! Runs one service day against a fresh database: stocks the pantry,
//! cooks, sells and prints the register.
//!
//! ## Usage
//! ```bash
//! # Run against ./fogon.db (or FOGON_DB_PATH)
//! cargo run -p fogon-db --bin demo-day
//!
//! # Use another database and close the register with 412.30 counted
//! cargo run -p fogon-db --bin demo-day -- --db ./demo.db --close 412.30
//!
//! # Dump the register summary as JSON for the reporting layer
//! cargo run -p fogon-db --bin demo-day -- --json
//! ```
//!
//! ## The Day
//! - Catalog: kilogram, 25 kg sack, piece and dozen; rice, chicken, eggs;
//!   paella and tortilla with recipes
//! - Register opened with a 200.00 float
//! - Purchases: a sack of rice, 4 kg of chicken, 2 dozen eggs
//! - Production: 12 paellas and 6 tortillas from their recipes
//! - Sales: 5 paellas at menu price, 3 tortillas at 8.00

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;

use fogon_core::{
    BaseUnit, Money, NewProduct, NewUnit, PurchaseLine, PurchaseRequest, Quantity, SaleLine,
};
use fogon_db::{AppConfig, Database, LedgerEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<String> = None;
    let mut counted: Option<Money> = None;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--close" | "-c" => {
                if i + 1 < args.len() {
                    counted = Some(args[i + 1].parse()?);
                    i += 1;
                }
            }
            "--json" => json = true,
            "--help" | "-h" => {
                println!("Fogon demo day");
                println!();
                println!("Usage: demo-day [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: FOGON_DB_PATH or ./fogon.db)");
                println!("  -c, --close <AMOUNT>   Close the register with this much cash counted");
                println!("      --json             Also print the register summary as JSON");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fogon=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = AppConfig::load()?;
    if let Some(path) = db_path {
        config.database_path = path.into();
    }

    println!("Fogon demo day");
    println!("==============");
    println!("Database: {}", config.database_path.display());
    println!();

    let engine = LedgerEngine::new(Database::new(config.db_config()).await?);
    println!("✓ Connected to database");

    if !engine.list_products(None).await?.is_empty() {
        println!("⚠ Database already has a catalog");
        println!("  Skipping the demo to avoid duplicates.");
        println!("  Delete the database file to run it again.");
        return Ok(());
    }

    // Catalog
    let kilo = engine
        .create_unit(&NewUnit {
            name: "Kilogram".to_string(),
            base_unit: BaseUnit::Kilogram,
            conversion_factor: Quantity::from_units(1),
        })
        .await?;
    let sack = engine
        .create_unit(&NewUnit {
            name: "Sack 25kg".to_string(),
            base_unit: BaseUnit::Kilogram,
            conversion_factor: Quantity::from_units(25),
        })
        .await?;
    let dozen = engine
        .create_unit(&NewUnit {
            name: "Dozen".to_string(),
            base_unit: BaseUnit::Unit,
            conversion_factor: Quantity::from_units(12),
        })
        .await?;
    engine
        .create_unit(&NewUnit {
            name: "Piece".to_string(),
            base_unit: BaseUnit::Unit,
            conversion_factor: Quantity::from_units(1),
        })
        .await?;

    let rice = engine
        .create_product(&NewProduct::ingredient("Rice", BaseUnit::Kilogram))
        .await?;
    let chicken = engine
        .create_product(&NewProduct::ingredient("Chicken", BaseUnit::Kilogram))
        .await?;
    let eggs = engine
        .create_product(&NewProduct::ingredient("Eggs", BaseUnit::Unit))
        .await?;
    let paella = engine
        .create_product(&NewProduct::dish("Paella", Money::from_cents(1450)))
        .await?;
    let tortilla = engine
        .create_product(&NewProduct::dish("Tortilla", Money::from_units(8)))
        .await?;

    engine
        .set_recipe_line(&paella.id, &rice.id, "0.25".parse()?)
        .await?;
    engine
        .set_recipe_line(&paella.id, &chicken.id, "0.2".parse()?)
        .await?;
    engine
        .set_recipe_line(&tortilla.id, &eggs.id, Quantity::from_units(3))
        .await?;
    println!("✓ Catalog: 4 units, 3 ingredients, 2 dishes");

    // Service
    let register = engine
        .open_register(Utc::now().date_naive(), Money::from_units(200))
        .await?;
    println!("✓ Register opened with {}", register.start_amount);

    let purchase = engine
        .record_purchase(&PurchaseRequest {
            register_id: register.id.clone(),
            description: "Morning market".to_string(),
            lines: vec![
                PurchaseLine {
                    product_id: rice.id.clone(),
                    unit_id: sack.id.clone(),
                    quantity_bought: Quantity::from_units(1),
                    total_cost: Money::from_units(30),
                },
                PurchaseLine {
                    product_id: chicken.id.clone(),
                    unit_id: kilo.id.clone(),
                    quantity_bought: Quantity::from_units(4),
                    total_cost: Money::from_units(36),
                },
                PurchaseLine {
                    product_id: eggs.id.clone(),
                    unit_id: dozen.id.clone(),
                    quantity_bought: Quantity::from_units(2),
                    total_cost: Money::from_cents(720),
                },
            ],
        })
        .await?;
    println!(
        "✓ Purchase: {} spent, balance {}",
        purchase.purchase.total_cost, purchase.balance_after
    );

    for (dish, portions) in [(&paella, 12), (&tortilla, 6)] {
        let run = engine
            .record_production_from_recipe(&dish.id, Quantity::from_units(portions))
            .await?;
        println!(
            "✓ Cooked {} {}: {} total, {} per portion",
            run.production.quantity_produced,
            dish.name,
            run.production.total_cost,
            run.production.unit_cost_real
        );
    }

    let sale = engine
        .record_sale(&[
            SaleLine {
                dish_id: paella.id.clone(),
                quantity: Quantity::from_units(5),
                unit_price: None,
            },
            SaleLine::new(tortilla.id.clone(), Quantity::from_units(3), Money::from_units(8)),
        ])
        .await?;
    println!(
        "✓ Sale: {} charged, {} cost of goods",
        sale.sale.total_amount,
        sale.cost_of_goods()
    );

    // Report
    let summary = engine.register_summary(&register.id).await?;
    println!();
    println!("Register {}", summary.register.business_date);
    println!("  Start     {:>10}", summary.register.start_amount);
    for line in &summary.by_category {
        println!("  {:<9} {:>10}  ({})", line.category, line.total, line.kind);
    }
    println!("  Balance   {:>10}", summary.balance);

    println!();
    println!("Stock");
    for product in engine.list_products(None).await? {
        let audit = engine.verify_stock(&product.id).await?;
        println!(
            "  {:<9} {:>10} {}{}",
            product.name,
            audit.cached,
            product.base_unit,
            if audit.in_sync() { "" } else { "  (out of sync)" }
        );
    }
    let valuation = engine.inventory_valuation().await?;
    println!(
        "  Value     {:>10}  ({} live lots)",
        valuation.total_value, valuation.live_lots
    );

    if json {
        println!();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if let Some(counted) = counted {
        let closed = engine.close_register(&register.id, counted).await?;
        println!();
        println!(
            "✓ Register closed: system {}, counted {}, difference {}",
            closed.end_amount_system.unwrap_or_default(),
            counted,
            closed.difference.unwrap_or_default()
        );
    }

    Ok(())
}
