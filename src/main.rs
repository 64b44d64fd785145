use concept_canvas::{init_logging, App};
use leptos::mount::mount_to_body;

fn main() {
	init_logging();
	mount_to_body(App);
}
