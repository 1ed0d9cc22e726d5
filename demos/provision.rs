//! Provision a Structurizr workspace and push a DSL file into it.
//!
//! Run with:
//! ```bash
//! STRUCTURIZR_HOST=http://localhost:8080 STRUCTURIZR_ADMIN_API_KEY=... \
//!     cargo run --example provision -- /opt/structurizr-cli workspace.dsl
//! ```
//!
//! Without a workspace file an empty workspace is created. Pass `--destroy`
//! as the last argument to delete the workspace again afterwards.

use structurizr::{CliPusher, Client, ContentSource, ProvisionRequest, Provisioner, WorkspaceApi};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("structurizr=info")),
        )
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let destroy = args.last().is_some_and(|a| a == "--destroy");
    if destroy {
        args.pop();
    }
    let cli_dir = args.first().cloned().unwrap_or_else(|| ".".to_string());
    let content = args.get(1).map(ContentSource::new);

    let client = Client::from_env()?;
    println!("Using {}", client.api_url());

    let provisioner = Provisioner::new(client.workspaces(), CliPusher::new(cli_dir), client.api_url());

    let provisioned = match provisioner.provision(ProvisionRequest { content }).await {
        Ok(provisioned) => provisioned,
        Err(e) if e.may_leave_resource() => {
            eprintln!("Provisioning failed and the workspace could not be removed:\n{e}");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let workspace = &provisioned.workspace;
    println!("Provisioned workspace ({:?}):", provisioned.state);
    println!("  ID:          {}", workspace.id);
    println!("  Name:        {}", workspace.name);
    println!("  Private URL: {}", workspace.private_url);
    println!("  API key:     {}", workspace.api_key);

    println!("\nAll workspaces:");
    for w in provisioner.api().list().await? {
        println!("  {:>4}  {}", w.id, w.name);
    }

    if destroy {
        let response = provisioner.destroy(workspace.id).await?;
        println!("\nDeleted workspace {}: {}", workspace.id, response.message);
    }

    Ok(())
}
