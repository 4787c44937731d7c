//! Integration tests for the state-space model and the system contract.

use cl_core::{Matrix, Vector};
use cl_dynamics::{DynamicalSystem, DynamicsError, LinearSystem, SystemInfo};

fn double_integrator() -> LinearSystem {
    let a = Matrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]);
    let b = Matrix::from_row_slice(2, 1, &[0.0, 1.0]);
    let c = Matrix::from_row_slice(1, 2, &[1.0, 0.0]);
    let d = Matrix::zeros(1, 1);
    LinearSystem::new(a, b, c, d).unwrap()
}

#[test]
fn dimensions_come_from_matrices() {
    let sys = double_integrator();
    assert_eq!((sys.n(), sys.m(), sys.p()), (2, 1, 1));
    assert_eq!(sys.info().name, "LinearSystem");
}

#[test]
fn evolution_and_output_laws() {
    let sys = double_integrator();
    let x = Vector::from_vec(vec![2.0, 3.0]);
    let u = Vector::from_vec(vec![-1.0]);
    let dx = sys.f(&x, &u, 0.0).unwrap();
    assert_eq!(dx, Vector::from_vec(vec![3.0, -1.0]));
    let y = sys.h(&x, &u, 0.0).unwrap();
    assert_eq!(y, Vector::from_vec(vec![2.0]));
}

#[test]
fn wrong_argument_length_is_reported() {
    let sys = double_integrator();
    let err = sys
        .f(&Vector::zeros(3), &Vector::zeros(1), 0.0)
        .unwrap_err();
    assert_eq!(
        err,
        DynamicsError::DimensionMismatch {
            what: "state",
            expected: 2,
            got: 3
        }
    );
}

#[test]
fn inconsistent_matrices_rejected() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(2, 1);
    assert!(LinearSystem::from_ab(a, b).is_err());

    let a = Matrix::zeros(2, 2);
    let b = Matrix::zeros(3, 1);
    assert!(LinearSystem::from_ab(a, b).is_err());
}

#[test]
fn input_free_system_is_allowed() {
    let a = Matrix::from_row_slice(2, 2, &[0.0, 1.0, -1.0, 0.0]);
    let sys = LinearSystem::from_ab(a, Matrix::zeros(2, 0)).unwrap();
    assert_eq!(sys.m(), 0);
    let x = Vector::from_vec(vec![1.0, 0.0]);
    let dx = sys.fsim(&x, 0.0).unwrap();
    assert_eq!(dx, Vector::from_vec(vec![0.0, -1.0]));
    assert!(sys.isavalidinput(&x, &Vector::zeros(0)));
}

#[test]
fn replacing_info_keeps_dimensions() {
    let sys = double_integrator();
    let info = SystemInfo::new(2, 1, 1)
        .unwrap()
        .with_name("cart")
        .with_state_bounds(
            Vector::from_vec(vec![-1.0, -2.0]),
            Vector::from_vec(vec![1.0, 2.0]),
        )
        .unwrap();
    let sys = sys.with_info(info).unwrap();
    assert_eq!(sys.info().name, "cart");
    assert!(!sys.isavalidstate(&Vector::from_vec(vec![0.0, 2.5])));

    let wrong = SystemInfo::new(3, 1, 1).unwrap();
    assert!(double_integrator().with_info(wrong).is_err());
}
