#[cfg(test)]
pub mod test_utils {
    use chrono::Duration;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::{Arc, Once};

    use crate::auth::Role;
    use crate::backend::{Backend, SharedBackend, SqliteBackend};
    use crate::database;
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::{AccountMetadata, NewDirector, NewSchool};
    use crate::state::AppState;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    pub struct TestUser {
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub school_id: String,
        pub role: Role,
        pub password: String,
    }

    pub struct TestSchool {
        pub school_id: String,
        pub school_name: String,
    }

    pub struct TestDirector {
        pub email: String,
        pub school_id: String,
    }

    #[derive(Default)]
    pub struct TestBackendBuilder {
        users: Vec<TestUser>,
        schools: Vec<TestSchool>,
        directors: Vec<TestDirector>,
    }

    impl TestBackendBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn user(
            mut self,
            email: &str,
            first_name: &str,
            last_name: &str,
            school_id: &str,
            role: Role,
        ) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                school_id: school_id.to_string(),
                role,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn admin(self, email: &str) -> Self {
            self.user(email, "Admin", "EduManage", "EDU001", Role::Admin)
        }

        pub fn student(self, email: &str, first_name: &str, last_name: &str) -> Self {
            self.user(email, first_name, last_name, "EDU001", Role::Student)
        }

        pub fn teacher(self, email: &str, first_name: &str, last_name: &str) -> Self {
            self.user(email, first_name, last_name, "EDU001", Role::Teacher)
        }

        pub fn school(mut self, school_id: &str, school_name: &str) -> Self {
            self.schools.push(TestSchool {
                school_id: school_id.to_string(),
                school_name: school_name.to_string(),
            });
            self
        }

        /// Adds a director account and its `directors` row.
        pub fn director(
            mut self,
            email: &str,
            first_name: &str,
            last_name: &str,
            school_id: &str,
        ) -> Self {
            self = self.user(email, first_name, last_name, school_id, Role::Director);
            self.directors.push(TestDirector {
                email: email.to_string(),
                school_id: school_id.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<TestBackend, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter("debug")
                    .with_test_writer()
                    .try_init();
            });

            let pool = database::connect("sqlite::memory:").await?;
            let backend = Arc::new(SqliteBackend::new(pool, Duration::hours(1)));

            let mut user_ids: HashMap<String, String> = HashMap::new();

            for user in &self.users {
                let metadata = AccountMetadata {
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    phone_number: Some("0123456789".to_string()),
                    school_id: user.school_id.clone(),
                    role: user.role,
                };

                let account = backend
                    .create_account(&user.email, &user.password, &metadata)
                    .await?;
                user_ids.insert(user.email.clone(), account.id);
            }

            for school in &self.schools {
                let director_id = self
                    .directors
                    .iter()
                    .find(|d| d.school_id == school.school_id)
                    .and_then(|d| user_ids.get(&d.email).cloned());

                backend
                    .upsert_school(&NewSchool {
                        school_id: school.school_id.clone(),
                        school_name: school.school_name.clone(),
                        director_id,
                    })
                    .await?;
            }

            let mut director_ids: HashMap<String, String> = HashMap::new();

            for director in &self.directors {
                let row = backend
                    .insert_director(&NewDirector {
                        user_id: user_ids.get(&director.email).cloned(),
                        school_id: director.school_id.clone(),
                        created_by: None,
                    })
                    .await?;
                director_ids.insert(director.email.clone(), row.id);
            }

            Ok(TestBackend {
                backend,
                user_ids,
                director_ids,
            })
        }
    }

    pub struct TestBackend {
        pub backend: Arc<SqliteBackend>,
        pub user_ids: HashMap<String, String>,
        pub director_ids: HashMap<String, String>,
    }

    impl TestBackend {
        pub fn shared(&self) -> SharedBackend {
            self.backend.clone()
        }

        pub fn pool(&self) -> &Pool<Sqlite> {
            self.backend.pool()
        }

        pub fn user_id(&self, email: &str) -> Option<String> {
            self.user_ids.get(email).cloned()
        }

        pub fn director_id(&self, email: &str) -> Option<String> {
            self.director_ids.get(email).cloned()
        }

        pub async fn count(&self, table: &str) -> i64 {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(self.pool())
                .await
                .expect("Failed to count rows")
        }
    }

    /// Admin, one teacher, one student and two directors, Jean Martin being
    /// the most recent.
    pub async fn create_standard_test_backend() -> TestBackend {
        TestBackendBuilder::new()
            .admin("admin@edumanage.com")
            .teacher("paul.bernard@edu001.edu", "Paul", "Bernard")
            .student("lucie.petit@edu001.edu", "Lucie", "Petit")
            .school("EDU001", "École Primaire Les Roses")
            .school("EDU002", "Collège Saint-Antoine")
            .director("marie.dupont@edu001.edu", "Marie", "Dupont", "EDU001")
            .director("jean.martin@edu002.edu", "Jean", "Martin", "EDU002")
            .build()
            .await
            .expect("Failed to build test backend")
    }

    pub async fn setup_test_client(test_backend: &TestBackend) -> Client {
        let rocket = init_rocket(AppState::new(test_backend.shared())).await;

        Client::tracked(rocket)
            .await
            .expect("Failed to create Rocket client")
    }

    pub async fn login_test_user(client: &Client, email: &str, password: &str) -> Value {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        response
            .into_json::<Value>()
            .await
            .expect("Login response was not JSON")
    }
}
