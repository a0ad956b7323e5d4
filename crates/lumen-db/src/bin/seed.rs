//! # Seed Data Generator
//!
//! Populates the database with a realistic small-shop catalog for
//! development, then runs one demo purchase and one demo sale through the
//! transaction engine so the dashboard has something to show.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p lumen-db --bin seed
//!
//! # Custom product count and database path
//! cargo run -p lumen-db --bin seed -- --count 200 --db ./data/lumen.db
//! ```

use std::env;

use rand::Rng;
use tracing_subscriber::EnvFilter;

use lumen_db::repository::group::{GroupMember, NewGroup};
use lumen_db::repository::product::NewProduct;
use lumen_db::repository::purchase::{NewPurchase, NewPurchaseItem};
use lumen_db::repository::sale::{NewSale, NewSaleItem};
use lumen_db::repository::supplier::NewSupplier;
use lumen_db::{Database, DbConfig};
use lumen_db::repository::category::NewCategory;

/// Categories with representative products.
const CATALOG: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &[
            "Coca-Cola 330ml",
            "Pepsi 330ml",
            "Sprite 330ml",
            "Mineral Water 500ml",
            "Orange Juice 1L",
            "Iced Tea 500ml",
            "Energy Drink 250ml",
            "Lemonade 330ml",
        ],
    ),
    (
        "Snacks",
        &[
            "Potato Chips 150g",
            "Tortilla Chips 200g",
            "Chocolate Bar 50g",
            "Cookies 300g",
            "Pretzels 250g",
            "Gummy Bears 100g",
            "Salted Peanuts 200g",
            "Crackers 180g",
        ],
    ),
    (
        "Dairy",
        &[
            "Whole Milk 1L",
            "Skim Milk 1L",
            "Greek Yogurt 500g",
            "Cheddar Cheese 200g",
            "Butter 250g",
            "Cream Cheese 150g",
            "Eggs Dozen",
            "Sour Cream 200g",
        ],
    ),
    (
        "Grocery",
        &[
            "White Bread",
            "Spaghetti 500g",
            "White Rice 1kg",
            "Canned Beans 400g",
            "Canned Tomatoes 400g",
            "Sunflower Oil 1L",
            "Sugar 1kg",
            "Flour 1kg",
        ],
    ),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Metro Wholesale", "Anna Keller"),
    ("FreshLine Distribution", "Tomas Ried"),
    ("CityFood Supply", "Mira Osei"),
];

/// `RUST_LOG` controls verbosity; defaults to info with quiet sqlx.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = usize::MAX;
    let mut db_path = String::from("./lumen_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(usize::MAX);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lumen POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Cap on products to generate (default: full catalog)");
                println!("  -d, --db <PATH>    Database file path (default: ./lumen_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lumen POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count_active().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut rng = rand::thread_rng();

    // Suppliers
    let mut supplier_ids = Vec::new();
    for (name, contact) in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(NewSupplier {
                name: name.to_string(),
                contact_person: Some(contact.to_string()),
                email: Some(format!(
                    "orders@{}.example",
                    name.to_lowercase().replace(' ', "-")
                )),
                phone: None,
                address: None,
            })
            .await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ {} suppliers", supplier_ids.len());

    // Categories and products
    let mut product_ids = Vec::new();
    let mut generated = 0usize;

    'outer: for (category_name, products) in CATALOG {
        let category = db
            .categories()
            .create(NewCategory {
                name: category_name.to_string(),
                description: None,
            })
            .await?;

        for (idx, name) in products.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let cost = rng.gen_range(50..1500);
            let margin = rng.gen_range(120..180); // percent of cost
            let product = db
                .products()
                .create(NewProduct {
                    sku: format!("{}-{:03}", &category_name[..3].to_uppercase(), idx + 1),
                    name: name.to_string(),
                    description: None,
                    category_id: Some(category.id.clone()),
                    unit_price_cents: cost * margin / 100,
                    cost_price_cents: cost,
                    stock_quantity: 0,
                    min_stock_level: 10,
                    unit: "pcs".to_string(),
                })
                .await?;
            product_ids.push(product.id);
            generated += 1;
        }
    }
    println!("✓ {} products across {} categories", generated, CATALOG.len());

    // A restock purchase so there is stock to sell
    let purchase = db
        .purchases()
        .create(NewPurchase {
            supplier_id: supplier_ids[0].clone(),
            items: product_ids
                .iter()
                .map(|id| NewPurchaseItem {
                    product_id: id.clone(),
                    quantity: 50,
                    unit_price_cents: 100,
                })
                .collect(),
            discount_cents: 0,
            tax_cents: 0,
            payment_status: Default::default(),
            user_id: "seed".to_string(),
        })
        .await?;
    println!("✓ Restock purchase {}", purchase.purchase.invoice_number);

    // A demo sale through the engine
    let sale = db
        .sales()
        .create(NewSale {
            customer_name: Some("Walk-in".to_string()),
            customer_email: None,
            customer_phone: None,
            items: product_ids
                .iter()
                .take(3)
                .map(|id| NewSaleItem {
                    product_id: id.clone(),
                    quantity: 2,
                    unit_price_cents: 500,
                })
                .collect(),
            discount_cents: 100,
            tax_cents: 200,
            payment_method: Default::default(),
            user_id: "seed".to_string(),
        })
        .await?;
    println!(
        "✓ Demo sale {} ({} lines)",
        sale.sale.invoice_number,
        sale.items.len()
    );

    // A demo bundle
    if product_ids.len() >= 2 {
        let group = db
            .groups()
            .create(NewGroup {
                name: "Breakfast Bundle".to_string(),
                description: Some("Milk, bread and eggs in one tap".to_string()),
                products: product_ids
                    .iter()
                    .take(3)
                    .map(|id| GroupMember {
                        product_id: id.clone(),
                        quantity: 1,
                    })
                    .collect(),
            })
            .await?;
        println!("✓ Product group '{}'", group.group.name);
    }

    // Dashboard snapshot of the seeded state, as the serving layer would
    // emit it.
    let dashboard = db.reports().dashboard().await?;
    println!();
    println!("Dashboard snapshot:");
    println!("{}", serde_json::to_string_pretty(&dashboard)?);

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
