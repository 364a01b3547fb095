use crate::config::validate_address;
use crate::lookup::formatters::{OutputFormat, format_metadata};
use crate::metadata::MetadataSource;
use anyhow::Result;

pub async fn cmd_token(
    source: &dyn MetadataSource,
    token_address: &str,
    format: &OutputFormat,
) -> Result<()> {
    validate_address(token_address)?;

    let metadata = source.token_metadata(token_address).await?;
    let output = format_metadata(token_address, &metadata, format);
    println!("{output}");

    Ok(())
}
