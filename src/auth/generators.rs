/// Generates a two-word pet name, used when a user registers without a username
pub fn generate_username() -> String {
    petname::Petnames::default().generate_one(2, "-")
}
