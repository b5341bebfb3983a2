use rocket::{Build, Rocket};

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    bookshelf_api::rocket()
}
