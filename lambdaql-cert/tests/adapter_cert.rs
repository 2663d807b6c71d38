use cucumber::World as _;
#[allow(unused_imports)]
use lambdaql_cert::steps::{adapter, graphql};
use lambdaql_cert::AdapterWorld;

#[tokio::main]
async fn main() {
    AdapterWorld::cucumber()
        .run_and_exit("tests/features")
        .await;
}
