use crate::geometry::{BoardGeometry, GeometryError};

#[test]
fn default_is_eight_by_eight_without_pass() {
    let g = BoardGeometry::default();
    assert_eq!(g.cells(), 64);
    assert_eq!(g.extra_actions(), 0);
    assert_eq!(g.occupancy_mask(), u64::MAX);
    assert!(g.check().is_ok());
}

#[test]
fn small_board_mask_covers_only_cells() {
    let g = BoardGeometry::new(4, 17).unwrap();
    assert_eq!(g.occupancy_mask(), 0xFFFF);
    assert_eq!(g.extra_actions(), 1);
}

#[test]
fn rejects_action_space_smaller_than_board() {
    assert_eq!(
        BoardGeometry::new(8, 63),
        Err(GeometryError::TooFewActions {
            n_actions: 63,
            cells: 64
        })
    );
}

#[test]
fn rejects_boards_that_do_not_fit_a_bitmask() {
    assert!(matches!(
        BoardGeometry::new(9, 81),
        Err(GeometryError::BoardSize { got: 9, .. })
    ));
    assert!(matches!(
        BoardGeometry::new(0, 0),
        Err(GeometryError::BoardSize { got: 0, .. })
    ));
}
