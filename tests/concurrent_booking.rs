mod common;

use std::sync::Arc;

use theatre_booking::geometry::SeatCoord;
use theatre_booking::services::{BookingError, BookingService};
use theatre_booking::store::{ReservationStore, Store};

use common::TestApp;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_of_many_racers_gets_the_seat() {
    let app = TestApp::new();
    let performance = Arc::new(app.small_performance().await);
    let store: Arc<dyn Store> = app.store.clone();
    let booking = BookingService::new(store);

    let mut users = Vec::new();
    for _ in 0..8 {
        users.push(app.user(false).await);
    }

    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let booking = booking.clone();
            let performance = performance.clone();
            let user_id = user.id;
            tokio::spawn(async move {
                let seats = [SeatCoord::new(2, 2), SeatCoord::new(2, 3)];
                booking.create_reservation(user_id, &performance, &seats).await
            })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(reservation) => {
                winners += 1;
                assert_eq!(reservation.tickets.len(), 2);
            }
            Err(BookingError::SeatsAlreadyTaken) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(app.store.ticket_count(), 2);
    assert_eq!(app.store.reservation_count(), 1);

    let taken = app.store.taken_seats(performance.id).await.unwrap();
    assert_eq!(taken.len(), 2);
    assert!(taken.contains(&SeatCoord::new(2, 2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_requests_all_succeed() {
    let app = TestApp::new();
    let performance = Arc::new(app.small_performance().await);
    let store: Arc<dyn Store> = app.store.clone();
    let booking = BookingService::new(store);

    let mut handles = Vec::new();
    for row in 1..=3 {
        let user = app.user(false).await;
        let booking = booking.clone();
        let performance = performance.clone();
        handles.push(tokio::spawn(async move {
            let seats: Vec<_> = (1..=4).map(|seat| SeatCoord::new(row, seat)).collect();
            booking.create_reservation(user.id, &performance, &seats).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(app.store.ticket_count(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_requests_leave_nothing_from_the_loser() {
    let app = TestApp::new();
    let performance = Arc::new(app.small_performance().await);
    let store: Arc<dyn Store> = app.store.clone();
    let booking = BookingService::new(store);
    let alice = app.user(false).await;
    let bob = app.user(false).await;

    let left = [SeatCoord::new(1, 1), SeatCoord::new(2, 2)];
    let right = [SeatCoord::new(3, 3), SeatCoord::new(2, 2)];

    let (first, second) = tokio::join!(
        booking.create_reservation(alice.id, &performance, &left),
        booking.create_reservation(bob.id, &performance, &right),
    );

    let loser_only = match (first, second) {
        (Ok(_), Err(BookingError::SeatsAlreadyTaken)) => right[0],
        (Err(BookingError::SeatsAlreadyTaken), Ok(_)) => left[0],
        other => panic!("expected exactly one winner, got {other:?}"),
    };

    let taken = app.store.taken_seats(performance.id).await.unwrap();
    assert_eq!(taken.len(), 2);
    assert!(taken.contains(&SeatCoord::new(2, 2)));
    assert!(!taken.contains(&loser_only));
    assert_eq!(app.store.reservation_count(), 1);
}

#[tokio::test]
async fn tickets_come_back_in_request_order() {
    let app = TestApp::new();
    let performance = app.small_performance().await;
    let alice = app.user(false).await;
    let store: Arc<dyn Store> = app.store.clone();
    let booking = BookingService::new(store);

    let requested = [SeatCoord::new(3, 1), SeatCoord::new(1, 4), SeatCoord::new(2, 2)];
    let reservation = booking
        .create_reservation(alice.id, &performance, &requested)
        .await
        .unwrap();
    let returned: Vec<_> = reservation.tickets.iter().map(|t| t.coord()).collect();
    assert_eq!(returned, requested);
}
