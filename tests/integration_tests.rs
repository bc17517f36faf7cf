// End-to-End Integration Tests for quicklist
// These tests verify complete list workflows through the public API

use quicklist::{Block, Direction, End, FillPolicy, Options, QuickList, SizeClass, Value};

fn values(list: &QuickList) -> Vec<Value> {
    list.iter(Direction::Forward).map(|e| e.unwrap().into_value()).collect()
}

fn count_list(fill: u16, depth: u16) -> QuickList {
    QuickList::new(Options::new().fill(FillPolicy::Count(fill)).compress_depth(depth)).unwrap()
}

/// Test a complete queue/stack workflow
#[test]
fn test_e2e_queue_and_stack() {
    let mut list = count_list(16, 1);

    // Queue: push tail, pop head
    for i in 0..100 {
        list.push_tail(format!("job:{}", i).as_bytes()).unwrap();
    }
    for i in 0..50 {
        let value = list.pop_head().unwrap().unwrap();
        assert_eq!(value, Value::from(format!("job:{}", i).as_str()));
    }

    // Stack: push head, pop head
    list.push_head(b"urgent").unwrap();
    assert_eq!(list.pop(End::Head).unwrap(), Some(Value::from("urgent")));

    assert_eq!(list.len(), 50);
    assert!(list.index(0).unwrap().matches(b"job:50"));
    assert!(list.index(-1).unwrap().matches(b"job:99"));
    list.check_invariants().unwrap();
}

/// Test the documented split scenario: fill 5, six pushes
#[test]
fn test_e2e_fill_five_split() {
    let mut list = count_list(5, 0);
    for i in 0..5 {
        list.push_tail(format!("v{}", i).as_bytes()).unwrap();
    }
    assert_eq!(list.node_count(), 1);
    assert_eq!(list.len(), 5);

    list.push_tail(b"v5").unwrap();
    let counts: Vec<usize> = list.nodes().map(|n| n.count).collect();
    assert_eq!(counts, vec![5, 1]);
    assert_eq!(list.len(), 6);
}

/// Test mixed integers and byte strings
#[test]
fn test_e2e_mixed_values() {
    let mut list = QuickList::default();
    let inputs: [&[u8]; 6] = [b"0", b"-1", b"9223372036854775807", b"007", b"text", b""];
    for v in inputs {
        list.push_tail(v).unwrap();
    }

    assert_eq!(
        values(&list),
        vec![
            Value::Int(0),
            Value::Int(-1),
            Value::Int(i64::MAX),
            Value::Bytes(b"007".to_vec()),
            Value::Bytes(b"text".to_vec()),
            Value::Bytes(Vec::new()),
        ]
    );
    for (i, v) in inputs.iter().enumerate() {
        assert!(list.index(i as i64).unwrap().matches(v));
    }
}

/// Test rotation scenario
#[test]
fn test_e2e_rotate() {
    let mut list = count_list(2, 0);
    for v in ["a", "b", "c"] {
        list.push_tail(v.as_bytes()).unwrap();
    }

    list.rotate().unwrap();
    assert_eq!(values(&list), vec![Value::from("c"), Value::from("a"), Value::from("b")]);
    list.rotate().unwrap();
    assert_eq!(values(&list), vec![Value::from("b"), Value::from("c"), Value::from("a")]);

    let mut empty = QuickList::default();
    empty.rotate().unwrap();
    assert!(empty.is_empty());
}

/// Test insert, replace and delete working together
#[test]
fn test_e2e_interior_edits() {
    let mut list = count_list(4, 1);
    for i in 0..12 {
        list.push_tail(format!("{}", i * 10).as_bytes()).unwrap();
    }

    let at_five = list.index(5).unwrap();
    list.insert_after(&at_five, b"55").unwrap();
    let at_five = list.index(5).unwrap();
    list.insert_before(&at_five, b"45").unwrap();
    list.replace_at_index(0, b"zero").unwrap();
    assert_eq!(list.delete_range(-2, 2).unwrap(), 2);

    let expected: Vec<Value> = vec![
        Value::from("zero"),
        Value::Int(10),
        Value::Int(20),
        Value::Int(30),
        Value::Int(40),
        Value::Int(45),
        Value::Int(50),
        Value::Int(55),
        Value::Int(60),
        Value::Int(70),
        Value::Int(80),
        Value::Int(90),
    ];
    assert_eq!(values(&list), expected);
    list.check_invariants().unwrap();
}

/// Test duplicate independence
#[test]
fn test_e2e_duplicate() {
    let mut list = count_list(8, 2);
    for i in 0..200 {
        list.push_tail(format!("payload-{:04}", i % 13).as_bytes()).unwrap();
    }

    let mut copy = list.duplicate().unwrap();
    assert_eq!(values(&copy), values(&list));
    assert_eq!(copy.len(), list.len());

    copy.delete_range(10, 100).unwrap();
    copy.replace_at_index(0, b"changed").unwrap();
    assert_eq!(list.len(), 200);
    assert!(list.index(0).unwrap().matches(b"payload-0000"));
    list.check_invariants().unwrap();
    copy.check_invariants().unwrap();
}

/// Test cursor-driven filtering
#[test]
fn test_e2e_cursor_filter() {
    let mut list = count_list(8, 1);
    for i in 0..100 {
        list.push_tail(i.to_string().as_bytes()).unwrap();
    }

    {
        let mut cursor = list.cursor(Direction::Forward);
        while let Some(entry) = cursor.advance().unwrap() {
            if entry.value().as_int().unwrap() % 3 == 0 {
                cursor.delete_current().unwrap();
            }
        }
    }

    let remaining: Vec<i64> = values(&list).iter().map(|v| v.as_int().unwrap()).collect();
    let expected: Vec<i64> = (0..100).filter(|i| i % 3 != 0).collect();
    assert_eq!(remaining, expected);
    list.check_invariants().unwrap();
}

/// Test building lists from existing blocks
#[test]
fn test_e2e_blocks() {
    let mut block = Block::new();
    for i in 0..10 {
        block.push_back(format!("b{}", i).as_bytes()).unwrap();
    }

    let options = Options::new().fill(FillPolicy::Size(SizeClass::Kb4));
    let mut list = QuickList::from_block(options, block.clone()).unwrap();
    assert_eq!(list.node_count(), 1);

    list.append_block(block.clone()).unwrap();
    list.append_values_from_block(&block).unwrap();
    assert_eq!(list.len(), 30);
    assert!(list.index(10).unwrap().matches(b"b0"));
    assert!(list.index(-1).unwrap().matches(b"b9"));
    list.check_invariants().unwrap();
}

/// Test options round trip through serde
#[test]
fn test_e2e_options_serde() {
    let options = Options::new().fill(FillPolicy::Size(SizeClass::Kb16)).compress_depth(3);
    let json = serde_json::to_string(&options).unwrap();
    assert!(json.contains("\"fill\":-3"));
    let restored: Options = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, options);

    let partial: Options = serde_json::from_str(r#"{"fill": 64}"#).unwrap();
    assert_eq!(partial.fill, FillPolicy::Count(64));
    assert_eq!(partial.compress_depth, 0);

    assert!(serde_json::from_str::<Options>(r#"{"fill": 0}"#).is_err());
    assert!(serde_json::from_str::<Options>(r#"{"fill": -6}"#).is_err());
}
