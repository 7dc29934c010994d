use popple::event::Entry;
use popple::ledger::{Ledger, LedgerStore, SqliteStore};
use popple::subject::Subject;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Ledger<SqliteStore> {
    Ledger::new(SqliteStore::open(dir.path().join("popple.sqlite")).unwrap())
}

#[test]
fn karma_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut ledger = open(&dir);
        ledger.bump_karma("g", &[Subject::new("rust", 3)]).unwrap();
        ledger.set_announce("g", false).unwrap();
    }
    let mut ledger = open(&dir);
    assert_eq!(ledger.check_karma("g", &["rust".to_string()]).unwrap(), vec![Entry::new("rust", 3)]);
    let out = ledger.bump_karma("g", &[Subject::new("rust", 1)]).unwrap();
    assert!(!out.announce);
    assert_eq!(out.entries, vec![Entry::new("rust", 4)]);
}

#[test]
fn zero_balance_rows_are_deleted() {
    let dir = TempDir::new().unwrap();
    let mut ledger = open(&dir);
    ledger.bump_karma("g", &[Subject::new("alice", 2)]).unwrap();
    let out = ledger.bump_karma("g", &[Subject::new("@alice", -2)]).unwrap();
    assert_eq!(out.entries, vec![Entry::new("alice", 0)]);
    assert_eq!(ledger.store().karma("g", "alice").unwrap(), None);
    assert_eq!(ledger.store().count("g").unwrap(), 0);

    // Re-applying a net-zero change leaves the store untouched.
    let out = ledger
        .bump_karma("g", &[Subject::new("alice", 1), Subject::new("alice", -1)])
        .unwrap();
    assert!(out.entries.is_empty());
    assert_eq!(ledger.store().count("g").unwrap(), 0);
}

#[test]
fn check_never_creates_rows() {
    let dir = TempDir::new().unwrap();
    let ledger = open(&dir);
    let names = vec!["ghost".to_string()];
    assert_eq!(ledger.check_karma("g", &names).unwrap(), vec![Entry::new("ghost", 0)]);
    assert_eq!(ledger.store().count("g").unwrap(), 0);
}

#[test]
fn leaderboard_returns_highest_values_first() {
    let dir = TempDir::new().unwrap();
    let mut ledger = open(&dir);
    ledger
        .bump_karma("g", &[Subject::new("a", 5), Subject::new("b", 3), Subject::new("c", 5)])
        .unwrap();
    ledger.bump_karma("other", &[Subject::new("z", 100)]).unwrap();

    let top = ledger.leaderboard("g", 2).unwrap();
    assert_eq!(top.len(), 2);
    assert!(top.iter().all(|e| e.karma == 5));
    assert!(top.windows(2).all(|w| w[0].karma >= w[1].karma));

    // Ties are listed by name.
    assert_eq!(top, vec![Entry::new("a", 5), Entry::new("c", 5)]);
}

#[test]
fn loserboard_returns_lowest_values_first() {
    let dir = TempDir::new().unwrap();
    let mut ledger = open(&dir);
    ledger
        .bump_karma("g", &[Subject::new("a", 5), Subject::new("b", -3), Subject::new("c", 1)])
        .unwrap();
    assert_eq!(
        ledger.loserboard("g", 10).unwrap(),
        vec![Entry::new("b", -3), Entry::new("c", 1), Entry::new("a", 5)]
    );
}
