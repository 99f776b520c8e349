pub mod leg;
pub mod quote;
pub mod share_link;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
