#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use serde_json::{Value, json};

    use crate::backend::Backend;
    use crate::models::NewDirector;
    use crate::test::utils::test_utils::{
        STANDARD_PASSWORD, TestBackendBuilder, create_standard_test_backend, login_test_user,
        setup_test_client,
    };

    fn director_form() -> Value {
        json!({
            "first_name": "Sophie",
            "last_name": "Leroy",
            "school_name": "Lycée Victor Hugo",
            "school_id": "EDU003",
            "phone_number": "0123456787",
            "password": "directeur2024"
        })
    }

    #[rocket::async_test]
    async fn test_login_api() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        let body = login_test_user(&client, "admin@edumanage.com", STANDARD_PASSWORD).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["redirect_url"], "/admin");
        assert_eq!(body["user"]["role"], "admin");

        let body = login_test_user(&client, "lucie.petit@edu001.edu", STANDARD_PASSWORD).await;
        assert_eq!(body["redirect_url"], "/dashboard");

        let body = login_test_user(&client, "lucie.petit@edu001.edu", "wrong_password").await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid login credentials");
    }

    #[rocket::async_test]
    async fn test_blank_fields_are_rejected() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({ "email": "   ", "password": "" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["errors"]["email"][0], "Email is required");
        assert_eq!(body["errors"]["password"][0], "Password is required");

        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": "new@edu001.edu",
                    "password": "secret",
                    "first_name": "Léa",
                    "last_name": " ",
                    "phone_number": "",
                    "school_id": "EDU001"
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"].get("last_name").is_some());
        assert!(body["errors"].get("phone_number").is_some());
        assert!(body["errors"].get("first_name").is_none());
    }

    #[rocket::async_test]
    async fn test_signup_then_duplicate() {
        let test_backend = TestBackendBuilder::new().build().await.unwrap();
        let client = setup_test_client(&test_backend).await;

        let form = json!({
            "email": "lea.moreau@edu001.edu",
            "password": "motdepasse",
            "first_name": "Léa",
            "last_name": "Moreau",
            "phone_number": "0611223344",
            "school_id": "EDU001"
        })
        .to_string();

        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(form.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(form)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        let body = login_test_user(&client, "lea.moreau@edu001.edu", "motdepasse").await;
        assert_eq!(body["user"]["role"], "student");
    }

    #[rocket::async_test]
    async fn test_demo_admin_endpoint_is_idempotent() {
        let test_backend = TestBackendBuilder::new().build().await.unwrap();
        let client = setup_test_client(&test_backend).await;

        for _ in 0..2 {
            let response = client.post("/api/demo-admin").dispatch().await;
            assert_eq!(response.status(), Status::Ok);
        }

        let body = login_test_user(&client, "admin@edumanage.com", "admin2024").await;
        assert_eq!(body["success"], true);
        assert_eq!(body["redirect_url"], "/admin");
    }

    #[rocket::async_test]
    async fn test_auth_required_apis() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        let endpoints = vec![
            "/api/me",
            "/api/profile",
            "/api/dashboard",
            "/api/admin/directors",
        ];

        for endpoint in endpoints {
            let response = client.get(endpoint).dispatch().await;
            assert_eq!(
                response.status(),
                Status::Unauthorized,
                "Endpoint {} did not require authentication",
                endpoint
            );
            let body: Value = response.into_json().await.unwrap();
            assert_eq!(body["redirect_url"], "/login");
        }
    }

    #[rocket::async_test]
    async fn test_public_endpoints() {
        let test_backend = TestBackendBuilder::new().build().await.unwrap();
        let client = setup_test_client(&test_backend).await;

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/api/landing").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["features"].as_array().unwrap().len(), 6);
        assert_eq!(body["highlights"].as_array().unwrap().len(), 3);
        assert_eq!(body["features"][0]["title"], "Gestion des Utilisateurs");
    }

    #[rocket::async_test]
    async fn test_logout_tears_down_session() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "lucie.petit@edu001.edu", STANDARD_PASSWORD).await;

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["display_name"], "Lucie Petit");
        assert!(body.get("token").is_none());

        let response = client.post("/api/logout").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["redirect_url"], "/login");

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(test_backend.count("user_sessions").await, 0);
    }

    #[rocket::async_test]
    async fn test_profile_api() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "paul.bernard@edu001.edu", STANDARD_PASSWORD).await;

        let response = client.get("/api/profile").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["loading"], false);
        assert_eq!(body["profile"]["role"], "teacher");
        assert_eq!(body["profile"]["first_name"], "Paul");
    }

    #[rocket::async_test]
    async fn test_dashboard_views_follow_role() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "marie.dupont@edu001.edu", STANDARD_PASSWORD).await;

        let response = client.get("/api/dashboard").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["title"], "Tableau de Bord");
        assert_eq!(body["content"]["view"], "dashboard");
        assert_eq!(body["content"]["stats"][0]["value"], "1,247");
        assert_eq!(body["content"]["activities"].as_array().unwrap().len(), 4);
        assert_eq!(body["can_view_school_statistics"], true);
        assert_eq!(body["can_manage_directors"], false);

        let response = client.get("/api/dashboard?view=grades").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["content"]["grades"][0]["subject"], "Mathématiques");
        assert_eq!(body["content"]["grades"][3]["grade"], "17/20");

        let response = client.get("/api/dashboard?view=attendance").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["content"]["present_rate"], 89);
        assert_eq!(body["content"]["week"][2]["status"], "late");

        let response = client.get("/api/dashboard?view=profile").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["content"]["initials"], "MD");
        assert_eq!(body["content"]["school_id"], "EDU001");
        assert_eq!(body["content"]["theme"], "light");

        let response = client.get("/api/dashboard?view=settings").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_theme_preference_round_trip() {
        let test_backend = TestBackendBuilder::new().build().await.unwrap();
        let client = setup_test_client(&test_backend).await;

        let response = client.get("/api/preferences/theme").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["theme"], "light");

        let response = client
            .put("/api/preferences/theme")
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["theme"], "dark");

        let response = client
            .put("/api/preferences/theme")
            .header(ContentType::JSON)
            .body(json!({ "theme": "dark" }).to_string())
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["theme"], "dark");

        let response = client.get("/api/preferences/theme").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["theme"], "dark");
    }

    #[rocket::async_test]
    async fn test_admin_gate_blocks_non_admins() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "marie.dupont@edu001.edu", STANDARD_PASSWORD).await;

        let response = client.get("/api/admin/directors").dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["redirect_url"], "/dashboard");
        assert!(body.get("directors").is_none());

        let response = client
            .post("/api/admin/directors")
            .header(ContentType::JSON)
            .body(director_form().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
        assert_eq!(test_backend.count("directors").await, 2);
    }

    #[rocket::async_test]
    async fn test_admin_without_profile_sees_placeholder() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "admin@edumanage.com", STANDARD_PASSWORD).await;

        let admin_id = test_backend.user_id("admin@edumanage.com").unwrap();
        sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(&admin_id)
            .execute(test_backend.pool())
            .await
            .unwrap();

        let response = client.get("/api/admin/directors").dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "unauthorized");
        assert_eq!(body["gate"]["state"], "pending");
    }

    #[rocket::async_test]
    async fn test_admin_directors_console() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "admin@edumanage.com", STANDARD_PASSWORD).await;

        let response = client.get("/api/admin/directors").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["count"], 2);
        assert_eq!(body["directors"][0]["display_name"], "Jean Martin");
        assert_eq!(body["directors"][1]["display_name"], "Marie Dupont");

        let response = client
            .get("/api/admin/directors?search=EDU002")
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["directors"][0]["first_name"], "Jean");
        assert_eq!(body["directors"][0]["last_name"], "Martin");
        assert_eq!(body["directors"][0]["status_label"], "Actif");
    }

    #[rocket::async_test]
    async fn test_admin_director_mutations() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "admin@edumanage.com", STANDARD_PASSWORD).await;

        let response = client
            .post("/api/admin/directors")
            .header(ContentType::JSON)
            .body(director_form().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(
            body["invalidated"],
            json!(["directors", "schools", "profiles"])
        );
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let response = client.get("/api/admin/directors?search=leroy").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["directors"][0]["school_name"], "Lycée Victor Hugo");

        let response = client
            .post(format!("/api/admin/directors/{}/toggle", id))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["is_active"], false);
        assert_eq!(body["invalidated"], json!(["directors"]));

        let response = client.get("/api/admin/directors?search=EDU003").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["directors"][0]["status_label"], "Inactif");

        let response = client
            .patch(format!("/api/admin/directors/{}", id))
            .header(ContentType::JSON)
            .body(json!({ "is_active": true }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .post(format!("/api/admin/directors/{}/edit", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotImplemented);

        let response = client
            .delete(format!("/api/admin/directors/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .delete(format!("/api/admin/directors/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client.get("/api/admin/directors").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["count"], 2);
    }

    #[rocket::async_test]
    async fn test_create_director_reports_failed_step() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "admin@edumanage.com", STANDARD_PASSWORD).await;

        let mut form = director_form();
        form["first_name"] = json!("Marie");
        form["last_name"] = json!("Dupont");
        form["school_id"] = json!("EDU001");

        let response = client
            .post("/api/admin/directors")
            .header(ContentType::JSON)
            .body(form.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);
        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"].get("account").is_some());

        let mut form = director_form();
        form["password"] = json!("  ");
        let response = client
            .post("/api/admin/directors")
            .header(ContentType::JSON)
            .body(form.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[rocket::async_test]
    async fn test_directors_console_shows_rows_written_elsewhere() {
        let test_backend = create_standard_test_backend().await;
        let client = setup_test_client(&test_backend).await;

        login_test_user(&client, "admin@edumanage.com", STANDARD_PASSWORD).await;

        let response = client.get("/api/admin/directors").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["count"], 2);

        test_backend
            .backend
            .insert_director(&NewDirector {
                user_id: None,
                school_id: "EDU009".to_string(),
                created_by: None,
            })
            .await
            .unwrap();

        let response = client.get("/api/admin/directors").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["count"], 3);
        assert_eq!(body["directors"][0]["school_id"], "EDU009");
    }
}
