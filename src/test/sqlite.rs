#[cfg(test)]
mod tests {
    use rocket::tokio;

    use crate::auth::Role;
    use crate::backend::Backend;
    use crate::backend::sqlite::conflict_on_duplicate;
    use crate::error::AppError;
    use crate::models::{AccountMetadata, DirectorUpdate, NewDirector, NewSchool};
    use crate::test::utils::test_utils::{
        STANDARD_PASSWORD, TestBackendBuilder, create_standard_test_backend,
    };

    fn metadata(role: Role) -> AccountMetadata {
        AccountMetadata {
            first_name: "Claire".to_string(),
            last_name: "Fontaine".to_string(),
            phone_number: None,
            school_id: "EDU001".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let test_backend = create_standard_test_backend().await;

        let err = test_backend
            .backend
            .sign_up("lucie.petit@edu001.edu", "autre", &metadata(Role::Student))
            .await
            .unwrap_err();

        assert!(err.is_already_registered());
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_passwords_are_hashed() {
        let test_backend = TestBackendBuilder::new()
            .student("claire.fontaine@edu001.edu", "Claire", "Fontaine")
            .build()
            .await
            .unwrap();

        let stored: String = sqlx::query_scalar("SELECT password FROM accounts WHERE email = ?")
            .bind("claire.fontaine@edu001.edu")
            .fetch_one(test_backend.pool())
            .await
            .unwrap();

        assert_ne!(stored, STANDARD_PASSWORD);
        assert!(bcrypt::verify(STANDARD_PASSWORD, &stored).unwrap());
    }

    #[tokio::test]
    async fn test_update_leaves_unset_fields_alone() {
        let test_backend = create_standard_test_backend().await;
        let id = test_backend.director_id("marie.dupont@edu001.edu").unwrap();

        test_backend
            .backend
            .update_director(
                &id,
                &DirectorUpdate {
                    is_active: None,
                    school_id: Some("EDU002".to_string()),
                },
            )
            .await
            .unwrap();

        let rows = test_backend.backend.list_directors().await.unwrap();
        let row = rows.iter().find(|row| row.director.id == id).unwrap();
        assert_eq!(row.director.school_id, "EDU002");
        assert!(row.director.is_active);
        assert_eq!(row.school_name(), "Collège Saint-Antoine");
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let test_backend = create_standard_test_backend().await;
        let backend = &test_backend.backend;

        assert!(matches!(
            backend.delete_director("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            backend
                .update_director("missing", &DirectorUpdate { is_active: Some(true), school_id: None })
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            backend.delete_account("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(backend.fetch_profile("missing").await.unwrap().is_none());
        assert!(backend.fetch_school("EDU999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_director_without_profile_or_school() {
        let test_backend = TestBackendBuilder::new().build().await.unwrap();

        test_backend
            .backend
            .insert_director(&NewDirector {
                user_id: None,
                school_id: "EDU404".to_string(),
                created_by: None,
            })
            .await
            .unwrap();

        let rows = test_backend.backend.list_directors().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].profile.is_none());
        assert!(rows[0].school.is_none());
        assert_eq!(rows[0].school_name(), "");
    }

    #[tokio::test]
    async fn test_deleting_account_detaches_director() {
        let test_backend = create_standard_test_backend().await;
        let user_id = test_backend.user_id("jean.martin@edu002.edu").unwrap();

        test_backend.backend.delete_account(&user_id).await.unwrap();

        assert!(test_backend.backend.fetch_profile(&user_id).await.unwrap().is_none());
        let rows = test_backend.backend.list_directors().await.unwrap();
        let row = rows
            .iter()
            .find(|row| row.director.school_id == "EDU002")
            .unwrap();
        assert!(row.director.user_id.is_none());
        assert!(row.profile.is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_school() {
        let test_backend = create_standard_test_backend().await;

        test_backend
            .backend
            .upsert_school(&NewSchool {
                school_id: "EDU002".to_string(),
                school_name: "Collège Saint-Antoine de Padoue".to_string(),
                director_id: None,
            })
            .await
            .unwrap();

        let school = test_backend
            .backend
            .fetch_school("EDU002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(school.school_name, "Collège Saint-Antoine de Padoue");
        assert!(school.director_id.is_none());
        assert!(school.is_active);

        test_backend.backend.delete_school("EDU002").await.unwrap();
        assert!(test_backend.backend.fetch_school("EDU002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_email_violation_is_conflict() {
        let test_backend = create_standard_test_backend().await;

        let err = sqlx::query(
            "INSERT INTO accounts (id, email, password, metadata, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("duplicate-id")
        .bind("lucie.petit@edu001.edu")
        .bind("hash")
        .bind("{}")
        .bind(chrono::Utc::now().naive_utc())
        .execute(test_backend.pool())
        .await
        .unwrap_err();

        let mapped = conflict_on_duplicate(err, "lucie.petit@edu001.edu");
        assert!(mapped.is_already_registered());

        let other = conflict_on_duplicate(sqlx::Error::RowNotFound, "x@edu001.edu");
        assert!(matches!(other, AppError::Database(_)));
    }
}
