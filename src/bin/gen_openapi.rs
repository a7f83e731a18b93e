use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let doc = chatroom_backend::api::openapi::ApiDoc::openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write("openapi.json", json)?;
    println!("Wrote openapi.json");
    Ok(())
}
