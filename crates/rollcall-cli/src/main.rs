use clap::{Parser, Subcommand};
use dialoguer::{Input, Password, Select};
use dotenvy::dotenv;
use sqlx::PgPool;

use rollcall_cli::admin::{self, NewAdmin};
use rollcall_cli::seeder::{self, SeedConfig};
use rollcall_core::{InstitutionKind, UserRole};
use rollcall_models::institutions::CreateInstitutionDto;

#[derive(Parser)]
#[command(name = "rollcall-cli")]
#[command(about = "Rollcall CLI - Administrative tools for Rollcall", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an institution and its first admin
    CreateInstitution {
        /// Institution name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// `school` or `college`
        #[arg(short = 'k', long)]
        kind: Option<InstitutionKind>,

        /// Short unique code, e.g. GHS
        #[arg(short = 'c', long)]
        code: Option<String>,

        /// Admin first name
        #[arg(long)]
        first_name: Option<String>,

        /// Admin last name
        #[arg(long)]
        last_name: Option<String>,

        /// Admin email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Admin password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Create an invite code for an institution
    CreateInvite {
        /// Institution code
        #[arg(short = 'c', long)]
        institution: String,

        /// Roles the code may sign up as, comma separated
        #[arg(short = 'r', long, value_delimiter = ',', default_value = "student")]
        roles: Vec<UserRole>,

        /// Number of signups the code allows
        #[arg(short = 'm', long, default_value = "50")]
        max_uses: i32,

        /// Days until the code expires
        #[arg(short = 'd', long)]
        expires_in_days: Option<i64>,
    },
    /// Seed the database with fake institutions, sections and users
    Seed {
        /// Number of institutions to create
        #[arg(short = 'i', long, default_value = "2")]
        institutions: usize,

        /// Number of sections per institution
        #[arg(long, default_value = "4")]
        sections: usize,

        /// Number of faculty per institution
        #[arg(long, default_value = "6")]
        faculty: usize,

        /// Number of students per section
        #[arg(long, default_value = "30")]
        students: usize,

        /// Academic year of the seeded sections
        #[arg(long, default_value = "2025-26")]
        academic_year: String,
    },
    /// Remove all seeded institutions and their data
    ClearSeed,
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}

fn prompt(label: &str, value: Option<String>) -> String {
    value.unwrap_or_else(|| {
        Input::new()
            .with_prompt(label)
            .interact_text()
            .unwrap_or_else(|e| fail(&format!("Failed to read {}", label.to_lowercase()), e))
    })
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|e| fail("DATABASE_URL must be set", e));

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .unwrap_or_else(|e| fail("Failed to connect to database", e));

    match cli.command {
        Commands::Migrate => handle_migrate(&pool).await,
        Commands::CreateInstitution {
            name,
            kind,
            code,
            first_name,
            last_name,
            email,
            password,
        } => {
            handle_create_institution(
                &pool, name, kind, code, first_name, last_name, email, password,
            )
            .await
        }
        Commands::CreateInvite {
            institution,
            roles,
            max_uses,
            expires_in_days,
        } => handle_create_invite(&pool, &institution, &roles, max_uses, expires_in_days).await,
        Commands::Seed {
            institutions,
            sections,
            faculty,
            students,
            academic_year,
        } => {
            let config = SeedConfig {
                institutions,
                sections_per_institution: sections,
                faculty_per_institution: faculty,
                students_per_section: students,
                academic_year,
            };
            if let Err(e) = seeder::seed_all(&pool, config).await {
                fail("Error seeding database", e);
            }
        }
        Commands::ClearSeed => match seeder::clear_all(&pool).await {
            Ok(count) => println!("✅ Cleared {} seeded institutions", count),
            Err(e) => fail("Error clearing seeded data", e),
        },
    }
}

async fn handle_migrate(pool: &PgPool) {
    match sqlx::migrate!("../../migrations").run(pool).await {
        Ok(()) => println!("✅ Migrations applied"),
        Err(e) => fail("Migration failed", e),
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_create_institution(
    pool: &PgPool,
    name: Option<String>,
    kind: Option<InstitutionKind>,
    code: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let name = prompt("Institution name", name);
    let kind = kind.unwrap_or_else(|| {
        let kinds = [InstitutionKind::School, InstitutionKind::College];
        let idx = Select::new()
            .with_prompt("Institution kind")
            .items(&["School", "College"])
            .default(0)
            .interact()
            .unwrap_or_else(|e| fail("Failed to read institution kind", e));
        kinds[idx]
    });
    let code = prompt("Institution code", code);
    let first_name = prompt("Admin first name", first_name);
    let last_name = prompt("Admin last name", last_name);
    let email = prompt("Admin email address", email);
    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Admin password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail("Failed to read password", e))
    });

    let dto = CreateInstitutionDto {
        name,
        kind,
        code,
        address: None,
        contact_email: None,
    };
    let new_admin = NewAdmin {
        first_name,
        last_name,
        email,
        password,
    };

    match admin::create_institution(pool, &dto, &new_admin).await {
        Ok(created) => {
            println!("\n✅ Institution created successfully!");
            println!("   Institution: {} ({})", dto.name, created.institution_id);
            println!("   Admin: {} ({})", new_admin.email, created.admin_id);
        }
        Err(e) => fail("Error creating institution", e),
    }
}

async fn handle_create_invite(
    pool: &PgPool,
    institution: &str,
    roles: &[UserRole],
    max_uses: i32,
    expires_in_days: Option<i64>,
) {
    match admin::create_invite(pool, institution, roles, max_uses, expires_in_days).await {
        Ok(code) => {
            let roles = roles
                .iter()
                .map(UserRole::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            println!("✅ Invite code: {}", code);
            println!("   Roles: {}", roles);
            println!("   Max uses: {}", max_uses);
        }
        Err(e) => fail("Error creating invite", e),
    }
}
