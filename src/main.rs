use std::error::Error;

use lifeplanner::logging::init_tracing;

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    lifeplanner::rocket().launch().await?;

    Ok(())
}
