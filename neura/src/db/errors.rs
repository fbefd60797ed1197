use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                // SQLite reports neither table nor constraint name, only "UNIQUE constraint failed: users.email"
                let (table, constraint) = match db_err.table() {
                    Some(table) => (Some(table.to_string()), db_err.constraint().map(|s| s.to_string())),
                    None => parse_sqlite_constraint(&message),
                };

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint,
                        table,
                        message,
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Extract `(table, constraint)` from a SQLite constraint message.
///
/// "UNIQUE constraint failed: users.email" yields `(Some("users"), Some("users.email"))`.
/// Multi-column failures ("... failed: monthly_usage.user_id, monthly_usage.month") keep
/// the full column list as the constraint.
fn parse_sqlite_constraint(message: &str) -> (Option<String>, Option<String>) {
    let Some((_, columns)) = message.split_once("constraint failed: ") else {
        return (None, None);
    };
    let columns = columns.trim();
    if columns.is_empty() {
        return (None, None);
    }

    let table = columns.split_once('.').map(|(table, _)| table.to_string());
    (table, Some(columns.to_string()))
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unique_constraint_message() {
        let (table, constraint) = parse_sqlite_constraint("UNIQUE constraint failed: users.email");
        assert_eq!(table.as_deref(), Some("users"));
        assert_eq!(constraint.as_deref(), Some("users.email"));
    }

    #[test]
    fn test_parse_multi_column_constraint_message() {
        let (table, constraint) = parse_sqlite_constraint("UNIQUE constraint failed: monthly_usage.user_id, monthly_usage.month");
        assert_eq!(table.as_deref(), Some("monthly_usage"));
        assert_eq!(constraint.as_deref(), Some("monthly_usage.user_id, monthly_usage.month"));
    }

    #[test]
    fn test_parse_check_constraint_message() {
        // CHECK failures name the expression, not a column
        let (table, constraint) = parse_sqlite_constraint("CHECK constraint failed: amount_cents >= 0");
        assert_eq!(table, None);
        assert_eq!(constraint.as_deref(), Some("amount_cents >= 0"));
    }

    #[test]
    fn test_parse_unrelated_message() {
        assert_eq!(parse_sqlite_constraint("database is locked"), (None, None));
    }
}
