fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    node_flow::run_app()
}
