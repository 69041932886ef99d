use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use server::auth::{Actor, CreateUserInput, Role, create_user};
use server::config;
use server::db::{init_pool, run_migrations};
use server::seed::seed;

#[derive(Parser)]
#[command(name = "cms")]
#[command(about = "Tourism CMS maintenance - migrations, users and sample data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a user account directly in the database
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// admin or editor
        #[arg(long, default_value = "editor")]
        role: Role,
        #[arg(long, env = "CMS_USER_PASSWORD")]
        password: String,
    },
    /// Insert sample categories, destinations and page content into an empty database
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = config::loader::load()?;

    // init_pool applies migrations as part of opening the database
    let (pool, db_root) = init_pool(&config.database).await?;

    match cli.command {
        Commands::Migrate => {
            run_migrations(&pool).await?;
            println!("✓ Migrations applied to {}", db_root.display());
        }
        Commands::CreateUser {
            email,
            name,
            role,
            password,
        } => {
            let input = CreateUserInput {
                email,
                name,
                password,
                role,
            };
            let user = create_user(
                &pool,
                &Actor::system(),
                input,
                config.auth.password_iterations,
            )
            .await
            .map_err(|err| anyhow!("{err}"))?;

            println!("✓ User created successfully!");
            println!("  ID:    {}", user.id);
            println!("  Email: {}", user.email);
            println!("  Role:  {}", user.role.as_str());
        }
        Commands::Seed => match seed(&pool).await? {
            Some(report) => {
                println!("✓ Sample content created");
                println!("  Categories:   {}", report.categories);
                println!("  Destinations: {}", report.destinations);
                println!("  Tours:        {}", report.tours);
                println!("  Events:       {}", report.events);
                println!("  Blog posts:   {}", report.posts);
            }
            None => println!("Database already has content; nothing to seed."),
        },
    }

    Ok(())
}
