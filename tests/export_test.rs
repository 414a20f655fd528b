mod common;

use anyhow::Result;
use common::{Marketplace, test_service};
use freelance_ledger::io::{Exporter, LedgerSnapshot};

#[tokio::test]
async fn test_export_users_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Marketplace { alice, .. } = Marketplace::create(&service).await?;
    service.add_skill(alice.id, "rust").await?;
    service.add_skill(alice.id, "sql").await?;

    let mut out = Vec::new();
    let count = Exporter::new(&service).export_users_csv(&mut out).await?;
    assert_eq!(count, 2);

    let text = String::from_utf8(out)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,name,balance,created_at,skills");
    assert!(lines[1].starts_with(&format!("{},alice,100000,", alice.id)));
    assert!(lines[1].ends_with(",rust;sql"));
    assert!(lines[2].ends_with(","));

    Ok(())
}

#[tokio::test]
async fn test_export_orders_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Marketplace { alice, bob } = Marketplace::create(&service).await?;

    let open = service.add_order(alice.id, "Open one", 100).await?;
    let done = service.add_order(alice.id, "Done one", 200).await?;
    service.complete_order(done.id, bob.id).await?;

    let mut out = Vec::new();
    let count = Exporter::new(&service).export_orders_csv(&mut out).await?;
    assert_eq!(count, 2);

    let mut reader = csv::Reader::from_reader(out.as_slice());
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;

    assert_eq!(&rows[0][0], open.id.to_string());
    assert_eq!(&rows[0][2], "");
    assert_eq!(&rows[0][6], "");
    assert_eq!(&rows[0][7], "open");

    assert_eq!(&rows[1][2], bob.id.to_string());
    assert_eq!(&rows[1][4], "200");
    assert!(!rows[1][6].is_empty());
    assert_eq!(&rows[1][7], "done");

    Ok(())
}

#[tokio::test]
async fn test_export_full_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let Marketplace { alice, bob } = Marketplace::create(&service).await?;
    let order = service.add_order(alice.id, "Snapshot me", 700).await?;
    service.reserve_order(order.id, bob.id).await?;

    let mut out = Vec::new();
    let snapshot = Exporter::new(&service).export_full_json(&mut out).await?;
    assert_eq!(snapshot.users.len(), 2);
    assert_eq!(snapshot.orders.len(), 1);

    let parsed: LedgerSnapshot = serde_json::from_slice(&out)?;
    assert_eq!(parsed.users, snapshot.users);
    assert_eq!(parsed.orders[0].assigned, Some(bob.id));
    assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));

    Ok(())
}
