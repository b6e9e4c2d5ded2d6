use actix_web::web::{scope, ServiceConfig};
use actix_web::Scope;

use admin::{
    delete_requirement_as_admin, delete_review_as_admin, get_pending_kyc, get_stats,
    list_users, purge_expired_messages, review_kyc, set_user_role, set_user_status,
};
use auth::{forgot_password, login, register, reset_password};
use chat::chat_socket;
use self::health_check::health_check as health_check_route;
use location::{clear_location, reverse_geocode, set_live_sharing, update_location};
use messages::{
    delete_message, get_conversation, get_conversations, get_unread_count, mark_read,
    send_message, toggle_like,
};
use profiles::{search_teachers, submit_kyc, upsert_student_profile, upsert_teacher_profile};
use requests::{cancel_request, get_incoming_requests, get_outgoing_requests, respond_to_request, send_request};
use requirements::{
    create_requirement, delete_requirement, get_my_requirements, get_requirement,
    list_requirements, update_requirement,
};
use reviews::{create_review, delete_review, get_user_reviews};
use users::{change_password, deactivate_account, find_nearby, get_me, get_user, update_me};

mod admin;
mod auth;
mod chat;
mod health_check;
mod location;
mod messages;
mod profiles;
mod requests;
mod requirements;
mod reviews;
mod users;

fn util_routes() -> Scope {
    scope("")
        .service(health_check_route)
        .service(chat_socket)
}

fn auth_routes() -> Scope {
    scope("auth")
        .service(register)
        .service(login)
        .service(forgot_password)
        .service(reset_password)
}

fn users_routes() -> Scope {
    // literal paths before /{user_id}
    scope("users")
        .service(get_me)
        .service(update_me)
        .service(deactivate_account)
        .service(change_password)
        .service(find_nearby)
        .service(get_user)
}

fn profiles_routes() -> Scope {
    scope("profiles")
        .service(upsert_student_profile)
        .service(upsert_teacher_profile)
        .service(search_teachers)
        .service(submit_kyc)
}

fn location_routes() -> Scope {
    scope("location")
        .service(update_location)
        .service(clear_location)
        .service(set_live_sharing)
        .service(reverse_geocode)
}

fn requirements_routes() -> Scope {
    scope("requirements")
        .service(create_requirement)
        .service(list_requirements)
        .service(get_my_requirements)
        .service(get_requirement)
        .service(update_requirement)
        .service(delete_requirement)
}

fn messages_routes() -> Scope {
    scope("messages")
        .service(send_message)
        .service(get_conversations)
        .service(get_unread_count)
        .service(get_conversation)
        .service(mark_read)
        .service(toggle_like)
        .service(delete_message)
}

fn reviews_routes() -> Scope {
    scope("reviews")
        .service(create_review)
        .service(get_user_reviews)
        .service(delete_review)
}

fn requests_routes() -> Scope {
    scope("requests")
        .service(send_request)
        .service(get_incoming_requests)
        .service(get_outgoing_requests)
        .service(respond_to_request)
        .service(cancel_request)
}

fn admin_routes() -> Scope {
    scope("admin")
        .service(get_stats)
        .service(list_users)
        .service(set_user_status)
        .service(set_user_role)
        .service(get_pending_kyc)
        .service(review_kyc)
        .service(delete_requirement_as_admin)
        .service(delete_review_as_admin)
        .service(purge_expired_messages)
}

pub fn tutor_connect_routes(conf: &mut ServiceConfig) {
    conf.service(
        scope("api/v1")
            .service(auth_routes())
            .service(users_routes())
            .service(profiles_routes())
            .service(location_routes())
            .service(requirements_routes())
            .service(messages_routes())
            .service(reviews_routes())
            .service(requests_routes())
            .service(admin_routes())
            .service(util_routes()),
    );
}
