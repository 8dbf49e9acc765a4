use anyhow::{bail, Context};
use clap::Subcommand;
use rand::Rng;
use sqlx::PgPool;

use crate::auth::hash_password;
use crate::cleanup::delete_user_data;
use crate::config::ServerConfig;
use crate::models::{is_valid_email, validate_name, CreateUser, Role};
use crate::storage::{
    ListQuery, LocalResumeStore, PostgresJobStore, PostgresUserStore, UserStore, USER_FIELDS,
};

/// User management subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a new user
    Create {
        /// User's email address
        #[arg(short, long)]
        email: String,

        /// User's display name
        #[arg(short, long)]
        name: String,

        /// Password (if not provided, a random one will be generated)
        #[arg(short, long)]
        password: Option<String>,

        /// Account role: user, employer or admin
        #[arg(short, long, default_value = "user")]
        role: Role,
    },

    /// List users, newest first
    List {
        /// Only users with this role
        #[arg(short, long)]
        role: Option<Role>,

        /// Maximum number of users to show
        #[arg(short, long, default_value = "100")]
        limit: u32,
    },

    /// Show user details
    Show {
        /// User's email address
        email: String,
    },

    /// Reset a user's password
    ResetPassword {
        /// User's email address
        #[arg(short, long)]
        email: String,

        /// New password (if not provided, a random one will be generated)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Change a user's role
    SetRole {
        /// User's email address
        #[arg(short, long)]
        email: String,

        /// New role: user, employer or admin
        #[arg(short, long)]
        role: Role,
    },

    /// Delete a user together with their jobs or applications
    Delete {
        /// User's email address
        #[arg(short, long)]
        email: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl UserCommands {
    /// Execute the user command
    pub async fn execute(self, pool: PgPool, config: &ServerConfig) -> anyhow::Result<()> {
        let user_store = PostgresUserStore::new(pool.clone());

        match self {
            UserCommands::Create {
                email,
                name,
                password,
                role,
            } => {
                validate_name(&name).map_err(anyhow::Error::msg)?;
                if !is_valid_email(&email) {
                    bail!("Invalid email address: {}", email);
                }

                let password = password.unwrap_or_else(generate_secure_password);
                let password_hash = hash_password(&password).context("Failed to hash password")?;

                let user = user_store
                    .create_user(CreateUser {
                        name,
                        email,
                        password_hash,
                        role,
                    })
                    .await?;

                println!("✅ User created successfully!");
                println!();
                println!("   Email:    {}", user.email);
                println!("   Name:     {}", user.name);
                println!("   Password: {}", password);
                println!("   Role:     {}", user.role);
                println!();
                println!("⚠️  Please securely share these credentials with the user.");
            }

            UserCommands::List { role, limit } => {
                let mut params = vec![("limit".to_string(), limit.to_string())];
                if let Some(role) = role {
                    params.push(("role".to_string(), role.to_string()));
                }
                let query = ListQuery::parse(&params, &USER_FIELDS, "-createdAt")?;
                let users = user_store.list_users(&query).await?;

                if users.is_empty() {
                    println!("No users found.");
                    return Ok(());
                }

                println!("{:<36} {:<30} {:<20} {:<10}", "ID", "Email", "Name", "Role");
                println!("{}", "-".repeat(99));

                for user in users {
                    println!(
                        "{:<36} {:<30} {:<20} {:<10}",
                        user.id,
                        truncate(&user.email, 28),
                        truncate(&user.name, 18),
                        user.role
                    );
                }
            }

            UserCommands::Show { email } => {
                let user = user_store.get_user_by_email(&email).await?;

                println!("User Details:");
                println!("  ID:      {}", user.id);
                println!("  Email:   {}", user.email);
                println!("  Name:    {}", user.name);
                println!("  Role:    {}", user.role);
                println!("  Created: {}", user.created_at);
            }

            UserCommands::ResetPassword { email, password } => {
                let user = user_store.get_user_by_email(&email).await?;
                let password = password.unwrap_or_else(generate_secure_password);
                let password_hash = hash_password(&password).context("Failed to hash password")?;

                user_store.update_password(user.id, &password_hash).await?;

                println!("✅ Password reset successfully!");
                println!();
                println!("   Email:        {}", user.email);
                println!("   New Password: {}", password);
                println!();
                println!("⚠️  Please securely share the new password with the user.");
            }

            UserCommands::SetRole { email, role } => {
                let user = user_store.get_user_by_email(&email).await?;
                user_store.set_role(user.id, role).await?;

                println!("✅ {} is now {} (was {}).", email, role, user.role);
            }

            UserCommands::Delete { email, force } => {
                let user = user_store.get_user_by_email(&email).await?;

                if !force {
                    println!(
                        "Are you sure you want to delete {} user {} and all of their data? (y/N)",
                        user.role, email
                    );
                    let mut input = String::new();
                    std::io::stdin().read_line(&mut input)?;
                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }

                let job_store = PostgresJobStore::new(pool);
                let resumes = LocalResumeStore::new(&config.upload_directory);
                let report = delete_user_data(&job_store, &resumes, &user).await?;
                user_store.delete_user(user.id).await?;

                println!("✅ User {} has been deleted.", email);
                println!("   Jobs processed: {}", report.succeeded.len());
                if !report.is_clean() {
                    println!(
                        "⚠️  {} job step(s) failed and {} resume file(s) were left behind; see logs.",
                        report.failed.len(),
                        report.resume_failures.len()
                    );
                }
            }
        }

        Ok(())
    }
}

/// Generate a secure random password
fn generate_secure_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789!@#$%&*";
    let mut rng = rand::thread_rng();

    (0..16)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Truncate string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_is_usable() {
        let password = generate_secure_password();
        assert_eq!(password.chars().count(), 16);
        assert!(hash_password(&password).is_ok());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-email@example.com", 10), "a-very-...");
    }
}
