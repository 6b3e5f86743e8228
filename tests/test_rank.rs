//! Integration tests for ranks and uniform element access

use std::collections::{BTreeSet, LinkedList};
use std::rc::Rc;

use lazyexpr::kernels::access::{axis_size, element_at};
use lazyexpr::{
    IntoValue, Operation, Rank, ShapeKind, Shared, Value, lazy, rank_of,
};

#[test]
fn test_rank_of_rust_types() {
    assert_eq!(rank_of::<()>(), -1);
    assert_eq!(rank_of::<i32>(), 0);
    assert_eq!(rank_of::<String>(), 0);
    assert_eq!(rank_of::<Rc<i32>>(), 0);
    assert_eq!(rank_of::<[i32; 4]>(), 1);
    assert_eq!(rank_of::<Vec<f64>>(), 1);
    assert_eq!(rank_of::<LinkedList<i32>>(), 1);
    assert_eq!(rank_of::<BTreeSet<i32>>(), 1);
    assert_eq!(rank_of::<[[i32; 3]; 2]>(), 2);
    assert_eq!(rank_of::<Vec<[i32; 3]>>(), 2);
    assert_eq!(rank_of::<Vec<Vec<Vec<i32>>>>(), 3);
    assert_eq!(rank_of::<Rc<Vec<i32>>>(), 0);
}

#[test]
fn test_reference_reports_referent_rank() {
    let s = Shared::new([[1i32, 2], [3, 4]]);
    assert_eq!(s.by_ref().rank(), 2);
    assert_eq!(s.by_cref().rank(), 2);
    assert_eq!(s.by_ref().shape_kind(), ShapeKind::FixedArray);
}

#[test]
fn test_scalar_access() {
    let v = 7i32.into_value();
    assert_eq!(axis_size(&v).unwrap(), 1);
    assert_eq!(*element_at(&v, 0).unwrap(), v);
    assert!(element_at(&v, 1).is_err());
}

#[test]
fn test_array_access() {
    let v = [1i32, 2, 3, 4, 5, 6, 7].into_value();
    assert_eq!(axis_size(&v).unwrap(), 7);
    for i in 0..7 {
        assert_eq!(*element_at(&v, i).unwrap(), (i as i32 + 1).into_value());
    }
    assert!(element_at(&v, 7).is_err());
}

#[test]
fn test_vector_access() {
    let v = vec![vec![1.5f64, 2.5], vec![3.5, 4.5]].into_value();
    assert_eq!(axis_size(&v).unwrap(), 2);
    let row = element_at(&v, 1).unwrap();
    assert_eq!(axis_size(&row).unwrap(), 2);
    assert_eq!(*element_at(&row, 0).unwrap(), 3.5f64.into_value());
}

#[test]
fn test_expression_ranks() {
    let vec_fn = Operation::from_fn("first", |v: Vec<i32>| v[0]);
    assert_eq!(lazy!(vec_fn.clone(), vec![1i32, 2]).unwrap().rank(), 0);
    assert_eq!(lazy!(vec_fn.clone(), vec![vec![1i32, 2]]).unwrap().rank(), 1);
    assert_eq!(lazy!(vec_fn, [[[1i32, 2]; 3]; 4]).unwrap().rank(), 2);

    let scalar_fn = Operation::from_fn("id", |x: i32| x);
    let e = lazy!(scalar_fn, [[1i32; 5]; 3]).unwrap();
    assert_eq!(e.rank(), 2);
    let as_value = Value::from(e);
    assert_eq!(as_value.rank(), 2);
    assert_eq!(as_value.shape_kind(), ShapeKind::Expression);
}

#[test]
fn test_expression_access() {
    let unit = Operation::from_fn("touch", |_x: i32| {});
    let e = lazy!(unit, [0i32; 7]).unwrap();
    assert_eq!(e.size().unwrap(), 7);

    let double = Operation::from_fn("double", |x: i32| x * 2);
    let v = Value::from(lazy!(double, [[1i32, 2, 3], [4, 5, 6]]).unwrap());
    assert_eq!(axis_size(&v).unwrap(), 2);
    let row = element_at(&v, 1).unwrap();
    assert_eq!(row.rank(), 1);
    assert_eq!(axis_size(&row).unwrap(), 3);
    assert_eq!(*element_at(&row, 2).unwrap(), 12i32.into_value());
}

#[test]
fn test_rank_zero_expression_is_one_wide() {
    let seven = Operation::from_fn("seven", || 7i32);
    let v = Value::from(lazy!(seven).unwrap());
    assert_eq!(v.rank(), 0);
    assert_eq!(axis_size(&v).unwrap(), 1);
    assert!(matches!(*element_at(&v, 0).unwrap(), Value::Expr(_)));
}
