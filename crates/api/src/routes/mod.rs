pub mod admin;
pub mod application;
pub mod collection;
pub mod health;
pub mod vacancy;

use axum::Router;
use eduboard_db::models::coaching::Coaching;
use eduboard_db::models::home_tuition::HomeTuition;
use eduboard_db::models::non_teacher::NonTeacher;
use eduboard_db::models::profile::{ParentProfile, StudentProfile};
use eduboard_db::models::school::School;
use eduboard_db::models::teacher::Teacher;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /teachers                          list, create
/// /teachers/reorder                  reorder (admin)
/// /teachers/{id}                     get, replace, patch, delete
///
/// /non-teachers                      same shape as /teachers
/// /coaching                          same shape as /teachers
/// /schools                           same shape as /teachers
/// /parents                           same shape as /teachers
/// /students                          same shape as /teachers
/// /home-tuitions                     same shape as /teachers (no sequence)
///
/// /vacancies                         list (approved only for the public), create
/// /vacancies/reorder                 reorder (admin)
/// /vacancies/{id}                    get, replace, patch, delete
/// /vacancies/{id}/approve            approve (admin)
/// /vacancies/{id}/reject             reject (admin)
/// /vacancies/{id}/close              close (owner or admin)
///
/// /applications                      list (mine or reviewers), apply
/// /applications/{id}                 get, replace, patch, delete
/// /applications/{id}/status          update status (reviewers)
///
/// /admin/outbox                      list outbox messages
/// /admin/outbox/{id}/retry           requeue a dead message
/// /admin/counters                    sequence counters
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/teachers", collection::router::<Teacher>())
        .nest("/non-teachers", collection::router::<NonTeacher>())
        .nest("/coaching", collection::router::<Coaching>())
        .nest("/schools", collection::router::<School>())
        .nest("/parents", collection::router::<ParentProfile>())
        .nest("/students", collection::router::<StudentProfile>())
        .nest("/home-tuitions", collection::router::<HomeTuition>())
        .nest("/vacancies", vacancy::router())
        .nest("/applications", application::router())
        .nest("/admin", admin::router())
}
