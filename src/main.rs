use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

#[path = "utils/config.rs"]
mod config;
#[path = "utils/database.rs"]
mod db;
#[path = "utils/encrypt.rs"]
mod enc;
#[path = "utils/enums.rs"]
mod enums;
#[path = "utils/error.rs"]
mod error;
#[path = "utils/token.rs"]
mod token;

#[path = "data/applications.rs"]
mod applications;
#[path = "data/internships.rs"]
mod internships;
#[path = "data/users.rs"]
mod users;

#[path = "utils/routes/admin.rs"]
mod admin_routes;
#[path = "utils/routes/applications.rs"]
mod application_routes;
#[path = "utils/routes/auth.rs"]
mod auth_routes;
#[path = "utils/routes/internships.rs"]
mod internship_routes;
#[path = "utils/routes/misc.rs"]
mod misc;
#[path = "utils/routes/students.rs"]
mod student_routes;

use config::Config;
use db::Database;

/// Registers every route. Literal segments are registered before their
/// sibling `{id}` routes so that e.g. /internships/search never binds as an
/// id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(misc::health_check)
        // auth
        .service(auth_routes::register_student)
        .service(auth_routes::register_company)
        .service(auth_routes::login)
        .service(auth_routes::me)
        .service(auth_routes::update_student_profile)
        .service(auth_routes::upload_resume)
        .service(auth_routes::update_company_profile)
        // internships
        .service(internship_routes::list_internships)
        .service(internship_routes::search_internships)
        .service(internship_routes::my_internships)
        .service(internship_routes::create_internship)
        .service(internship_routes::apply_to_internship)
        .service(internship_routes::update_internship)
        .service(internship_routes::delete_internship)
        .service(internship_routes::get_internship)
        // applications
        .service(application_routes::my_applications)
        .service(application_routes::my_messages)
        .service(application_routes::application_stats)
        .service(application_routes::company_application_stats)
        .service(application_routes::company_applications)
        .service(application_routes::company_update_status)
        .service(application_routes::admin_update_status)
        .service(application_routes::list_applications)
        // admin
        .service(admin_routes::list_companies)
        .service(admin_routes::update_company)
        .service(admin_routes::set_company_approval)
        .service(admin_routes::delete_company)
        .service(admin_routes::list_internships)
        .service(admin_routes::create_internship)
        .service(admin_routes::update_internship)
        .service(admin_routes::set_internship_approval)
        .service(admin_routes::delete_internship)
        .service(admin_routes::list_applications)
        .service(admin_routes::update_application_status)
        .service(admin_routes::list_students)
        .service(admin_routes::delete_student)
        .service(admin_routes::dashboard)
        .service(admin_routes::update_user_status)
        // students
        .service(student_routes::get_profile)
        .service(student_routes::update_profile)
        .service(student_routes::update_password)
        .service(student_routes::get_student);
}

fn seed_admin(database: &Database, email: &str, password: &str) -> Result<bool, error::ApiError> {
    let conn = database.conn()?;
    let hash = enc::hash_password(password)?;
    users::ensure_admin(&conn, email, &hash)
}

fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_header()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let host = config.host.clone();
    let port = config.port;

    let database = Database::open(&config.database_path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", e)))?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let seeded = seed_admin(&database, email, password)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", e)))?;
        if seeded {
            log::info!("seeded admin account {}", email);
        }
    }

    let db_data = web::Data::new(database);
    let config_data = web::Data::new(config);

    log::info!("internlink backend listening on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .wrap(Logger::default())
            .wrap(cors_policy())
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    const SECRET: &str = "test-secret";

    fn test_state() -> (web::Data<Database>, web::Data<Config>) {
        let database = web::Data::new(Database::open_in_memory().unwrap());
        let config = web::Data::new(Config {
            database_path: ":memory:".to_string(),
            jwt_secret: SECRET.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            admin_email: None,
            admin_password: None,
        });
        (database, config)
    }

    fn admin_token() -> String {
        token::issue(999, "admin@internlink.test", enums::Role::Admin, SECRET).unwrap()
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn health_check_answers_without_auth() {
        let (database, config) = test_state();
        let app = test::init_service(
            App::new().app_data(database).app_data(config).configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn me_without_token_is_unauthorized() {
        let (database, config) = test_state();
        let app = test::init_service(
            App::new().app_data(database).app_data(config).configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/auth/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn full_marketplace_flow() {
        let (database, config) = test_state();
        let app = test::init_service(
            App::new().app_data(database).app_data(config).configure(configure),
        )
        .await;

        // Student signs up.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/student/register")
                .set_json(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "ada@example.com",
                    "password": "password123"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let student_token = body["token"].as_str().unwrap().to_string();

        // Company signs up; login stays blocked until approval.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/company/register")
                .set_json(json!({
                    "company_name": "Babbage Engines",
                    "email": "co@example.com",
                    "password": "password123"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let company_id = body["user"]["id"].as_i64().unwrap();

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "email": "co@example.com", "password": "password123" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Wrong password on a pending company reads as plain bad credentials.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "email": "co@example.com", "password": "wrong" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Admin approves the company; the same credentials now work.
        let resp = test::call_service(
            &app,
            test::TestRequest::patch()
                .uri(&format!("/api/admin/companies/{}/approval", company_id))
                .insert_header(bearer(&admin_token()))
                .set_json(json!({ "is_approved": true }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "email": "co@example.com", "password": "password123" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let company_token = body["token"].as_str().unwrap().to_string();

        // Company posts an internship; it stays hidden until approved.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/internships")
                .insert_header(bearer(&company_token))
                .set_json(json!({ "title": "Engine Intern", "location": "London" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let internship_id = body["internship"]["id"].as_i64().unwrap();

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/internships").to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["internships"].as_array().unwrap().len(), 0);

        let resp = test::call_service(
            &app,
            test::TestRequest::patch()
                .uri(&format!("/api/admin/internships/{}/approval", internship_id))
                .insert_header(bearer(&admin_token()))
                .set_json(json!({ "is_approved": true }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/internships").to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["internships"].as_array().unwrap().len(), 1);

        // Student applies once, then trips the duplicate guard.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/internships/{}/apply", internship_id))
                .insert_header(bearer(&student_token))
                .set_json(json!({ "cover_letter": "I love engines" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let application_id = body["application"]["id"].as_i64().unwrap();

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/internships/{}/apply", internship_id))
                .insert_header(bearer(&student_token))
                .set_json(json!({}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Company hires with a note; the student sees decision and message.
        let resp = test::call_service(
            &app,
            test::TestRequest::patch()
                .uri(&format!("/api/applications/company/{}/status", application_id))
                .insert_header(bearer(&company_token))
                .set_json(json!({ "status": "Hired", "message": "Welcome aboard!" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/applications/my-applications")
                .insert_header(bearer(&student_token))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let apps = body["applications"].as_array().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0]["status"], "Hired");
        assert_eq!(apps[0]["company_message"], "Welcome aboard!");

        // Dashboard counts mirror the rows created above.
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/admin/dashboard")
                .insert_header(bearer(&admin_token()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["stats"]["total_students"], 1);
        assert_eq!(body["stats"]["total_companies"], 1);
        assert_eq!(body["stats"]["total_internships"], 1);
        assert_eq!(body["stats"]["total_applications"], 1);
    }

    #[actix_web::test]
    async fn company_cannot_touch_anothers_application() {
        let (database, config) = test_state();
        let app = test::init_service(
            App::new().app_data(database.clone()).app_data(config).configure(configure),
        )
        .await;

        // Seed two companies, one posting, one application through the store.
        let (application_id, intruder_token) = {
            let mut conn = database.conn().unwrap();
            let student =
                users::register_student(&mut conn, &users::tests::student_request("s@example.com"), "hash").unwrap();
            let owner =
                users::register_company(&mut conn, &users::tests::company_request("owner@example.com"), "hash").unwrap();
            let intruder =
                users::register_company(&mut conn, &users::tests::company_request("intruder@example.com"), "hash")
                    .unwrap();
            users::set_company_approval(&conn, owner, true).unwrap();
            users::set_company_approval(&conn, intruder, true).unwrap();
            let posting = internships::create(
                &conn,
                owner,
                &internships::InternshipPayload {
                    title: "Engine Intern".to_string(),
                    description: None,
                    requirements: None,
                    responsibilities: None,
                    location: None,
                    internship_type: None,
                    duration: None,
                    stipend: None,
                    deadline: None,
                    is_active: true,
                },
                true,
            )
            .unwrap();
            let application = applications::apply(&conn, student, posting.id, None).unwrap();
            let token = token::issue(intruder, "intruder@example.com", enums::Role::Company, SECRET).unwrap();
            (application["id"].as_i64().unwrap(), token)
        };

        let resp = test::call_service(
            &app,
            test::TestRequest::patch()
                .uri(&format!("/api/applications/company/{}/status", application_id))
                .insert_header(bearer(&intruder_token))
                .set_json(json!({ "status": "Rejected" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
