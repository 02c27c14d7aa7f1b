//! End-to-end task flow tests: confirm/cancel a transaction through the
//! saga, export its task set, and work the queue.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::AgentId;
use domain::{
    Agent, CustomerContact, DiscountTicketUnit, EventId, Money, Order, SeatOfferRequest, Seller,
    SellerId, SellerType, Task, TaskKind, TaskPayload, TaskStatus, TicketType, Transaction,
    TransactionKind, TransactionStatus,
};
use executor::{Dispatcher, ExecutorError, TaskContext, TaskExecutor};
use saga::services::{
    InMemoryAccountService, InMemoryAdmissionTokenVerifier, InMemoryConfirmationNumberPublisher,
    InMemoryCreditCardService, InMemoryDiscountTicketService, InMemoryNotificationSender,
    InMemoryOrderNumberPublisher, InMemorySeatReservationService,
};
use saga::{
    AuthorizeAccountParams, AuthorizeCreditCardParams, AuthorizeDiscountTicketParams,
    AuthorizePointAwardParams, AuthorizeSeatReservationParams, ConfirmParams, OrderPlacementSaga,
    PlaceOrderDependencies, StartParams,
};
use store::{
    ActionStore, InMemoryActionStore, InMemoryOrderStore, InMemoryTaskStore,
    InMemoryTransactionStore, OrderStore, TaskStore, TransactionStore,
};

const OPERATOR: &str = "ops@boxoffice.example";

struct Fixture {
    saga: OrderPlacementSaga,
    executor: TaskExecutor,
    dispatcher: Dispatcher,
    transactions: InMemoryTransactionStore,
    actions: InMemoryActionStore,
    tasks: InMemoryTaskStore,
    orders: InMemoryOrderStore,
    seat_reservation: InMemorySeatReservationService,
    credit_card: InMemoryCreditCardService,
    account: InMemoryAccountService,
    discount_ticket: InMemoryDiscountTicketService,
    notifications: InMemoryNotificationSender,
    seller: Seller,
    agent: Agent,
}

fn setup() -> Fixture {
    let transactions = InMemoryTransactionStore::new();
    let actions = InMemoryActionStore::new();
    let tasks = InMemoryTaskStore::new();
    let orders = InMemoryOrderStore::new();
    let seat_reservation = InMemorySeatReservationService::new();
    let credit_card = InMemoryCreditCardService::new();
    let account = InMemoryAccountService::new();
    let discount_ticket = InMemoryDiscountTicketService::new();
    let notifications = InMemoryNotificationSender::new();

    seat_reservation.register_ticket_type(TicketType {
        code: "TT-GENERAL".to_string(),
        name: "General".to_string(),
        charge: Money::from_cents(1800),
        point_requirement: 0,
        discount_service_type: None,
    });
    seat_reservation.register_ticket_type(TicketType {
        code: "TT-DISCOUNT".to_string(),
        name: "Discount ticket holder".to_string(),
        charge: Money::from_cents(1400),
        point_requirement: 0,
        discount_service_type: Some("DT-STANDARD".to_string()),
    });

    let saga = OrderPlacementSaga::new(PlaceOrderDependencies {
        transactions: Arc::new(transactions.clone()),
        actions: Arc::new(actions.clone()),
        seat_reservation: Arc::new(seat_reservation.clone()),
        credit_card: Arc::new(credit_card.clone()),
        account: Arc::new(account.clone()),
        discount_ticket: Arc::new(discount_ticket.clone()),
        token_verifier: Arc::new(InMemoryAdmissionTokenVerifier::new(
            "https://waiter.example.com",
        )),
        order_number: Arc::new(InMemoryOrderNumberPublisher::new()),
        confirmation_number: Arc::new(InMemoryConfirmationNumberPublisher::new()),
    });

    let context = TaskContext {
        transactions: Arc::new(transactions.clone()),
        actions: Arc::new(actions.clone()),
        tasks: Arc::new(tasks.clone()),
        orders: Arc::new(orders.clone()),
        seat_reservation: Arc::new(seat_reservation.clone()),
        credit_card: Arc::new(credit_card.clone()),
        account: Arc::new(account.clone()),
        discount_ticket: Arc::new(discount_ticket.clone()),
        notifications: Arc::new(notifications.clone()),
    };

    let executor = TaskExecutor::new(context);
    let dispatcher = Dispatcher::new(
        Arc::new(transactions.clone()),
        Arc::new(tasks.clone()),
        Arc::new(notifications.clone()),
        OPERATOR,
    );

    Fixture {
        saga,
        executor,
        dispatcher,
        transactions,
        actions,
        tasks,
        orders,
        seat_reservation,
        credit_card,
        account,
        discount_ticket,
        notifications,
        seller: Seller::new(SellerId::new(), "Cinema Sunshine", "118", SellerType::MovieTheater),
        agent: Agent::new(AgentId::new()),
    }
}

fn contact() -> CustomerContact {
    CustomerContact {
        family_name: "Yamada".to_string(),
        given_name: "Taro".to_string(),
        email: "taro@example.com".to_string(),
        telephone: "+819012345678".to_string(),
    }
}

impl Fixture {
    async fn start(&self) -> Transaction {
        self.saga
            .start(StartParams {
                expires: Utc::now() + Duration::minutes(15),
                agent: self.agent.clone(),
                seller: self.seller.clone(),
                passport_token: None,
            })
            .await
            .unwrap()
    }

    async fn authorize_general_seat(&self, transaction: &Transaction) {
        self.saga
            .authorize_seat_reservation(AuthorizeSeatReservationParams {
                transaction_id: transaction.id,
                agent_id: self.agent.id,
                requested_seats: vec![SeatOfferRequest {
                    event_id: EventId::new("evt-1"),
                    seat_number: "A-1".to_string(),
                    ticket_type_code: "TT-GENERAL".to_string(),
                }],
            })
            .await
            .unwrap();
    }

    async fn authorize_card(&self, transaction: &Transaction, amount: i64) {
        self.saga
            .authorize_credit_card(AuthorizeCreditCardParams {
                transaction_id: transaction.id,
                agent_id: self.agent.id,
                amount: Money::from_cents(amount),
                card_token: "tok_visa".to_string(),
            })
            .await
            .unwrap();
    }

    async fn confirm(&self, transaction: &Transaction) -> Order {
        self.saga
            .set_customer_contact(transaction.id, self.agent.id, contact())
            .await
            .unwrap();
        self.saga
            .confirm(ConfirmParams {
                transaction_id: transaction.id,
                agent_id: self.agent.id,
            })
            .await
            .unwrap()
    }

    async fn confirmed_transaction(&self) -> (Transaction, Order) {
        let transaction = self.start().await;
        self.authorize_general_seat(&transaction).await;
        self.authorize_card(&transaction, 1800).await;
        let order = self.confirm(&transaction).await;
        (transaction, order)
    }

    async fn execute_one(&self, kind: TaskKind) -> Task {
        self.executor.execute_by_kind(kind).await.unwrap().unwrap()
    }
}

fn kinds(tasks: &[Task]) -> Vec<TaskKind> {
    let mut kinds: Vec<_> = tasks.iter().map(Task::kind).collect();
    kinds.sort_by_key(|kind| kind.as_str());
    kinds
}

#[tokio::test]
async fn test_confirmed_transaction_exports_exactly_the_create_order_task() {
    let f = setup();
    let (transaction, _) = f.confirmed_transaction().await;

    let exported = f
        .dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(exported, Some(transaction.id));

    let tasks = f.tasks.all().await;
    assert_eq!(kinds(&tasks), vec![TaskKind::CreateOrder]);

    let stored = f.transactions.find(transaction.id).await.unwrap();
    assert_eq!(
        stored.task_export_status,
        domain::TaskExportStatus::Exported
    );

    // Nothing left to export.
    let again = f
        .dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Confirmed)
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_canceled_transaction_exports_exactly_the_compensation_set() {
    let f = setup();
    let transaction = f.start().await;
    f.saga.cancel(transaction.id, f.agent.id).await.unwrap();

    f.dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Canceled)
        .await
        .unwrap()
        .unwrap();

    let tasks = f.tasks.all().await;
    assert_eq!(
        kinds(&tasks),
        vec![
            TaskKind::CancelAccount,
            TaskKind::CancelCreditCard,
            TaskKind::CancelPointAward,
            TaskKind::CancelSeatReservation,
        ]
    );
}

#[tokio::test]
async fn test_task_export_for_open_transactions_is_a_design_invariant() {
    let f = setup();
    let transaction = f.start().await;

    let result = f.dispatcher.export_tasks_by_id(transaction.id).await;
    assert!(matches!(result, Err(ExecutorError::NotImplemented(_))));
}

#[tokio::test]
async fn test_create_order_materializes_and_fans_out() {
    let f = setup();
    let (transaction, order) = f.confirmed_transaction().await;
    f.dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Confirmed)
        .await
        .unwrap();

    let executed = f.execute_one(TaskKind::CreateOrder).await;
    assert_eq!(executed.status, TaskStatus::Executed);

    let stored = f.orders.find_by_order_number(&order.order_number).await.unwrap();
    assert_eq!(stored.transaction_id, transaction.id);

    let follow_ups = f.tasks.all().await;
    assert_eq!(
        kinds(&follow_ups),
        vec![
            TaskKind::CreateOrder,
            TaskKind::SendEmailMessage,
            TaskKind::SendOrder,
            TaskKind::SettleCreditCard,
        ]
    );
}

#[tokio::test]
async fn test_settlement_delivery_and_notification_handlers() {
    let f = setup();
    let (transaction, order) = f.confirmed_transaction().await;
    f.dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Confirmed)
        .await
        .unwrap();
    f.execute_one(TaskKind::CreateOrder).await;

    let settled = f.execute_one(TaskKind::SettleCreditCard).await;
    assert_eq!(settled.status, TaskStatus::Executed);
    assert_eq!(f.credit_card.captured_count(), 1);
    assert_eq!(f.credit_card.pending_count(), 0);

    let delivered = f.execute_one(TaskKind::SendOrder).await;
    assert_eq!(delivered.status, TaskStatus::Executed);
    let stored = f.orders.find_by_order_number(&order.order_number).await.unwrap();
    assert_eq!(stored.order_status, domain::OrderStatus::Delivered);

    let mailed = f.execute_one(TaskKind::SendEmailMessage).await;
    assert_eq!(mailed.status, TaskStatus::Executed);
    assert_eq!(f.notifications.sent_count(), 1);
    assert_eq!(f.notifications.sent()[0].to, "taro@example.com");

    // The pay and send sub-steps left durable completed actions.
    let actions = f.actions.search_by_purpose(transaction.id).await.unwrap();
    let completed_pays = actions
        .iter()
        .filter(|action| {
            action.kind == domain::ActionKind::Pay
                && action.status == domain::ActionStatus::Completed
        })
        .count();
    assert_eq!(completed_pays, 1);
}

#[tokio::test]
async fn test_handler_failure_leaves_the_task_running_for_the_sweeps() {
    let f = setup();
    let (transaction, _) = f.confirmed_transaction().await;
    f.dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Confirmed)
        .await
        .unwrap();
    f.execute_one(TaskKind::CreateOrder).await;

    f.credit_card.set_fail_on_capture(true);
    let failed = f.execute_one(TaskKind::SettleCreditCard).await;
    assert_eq!(failed.status, TaskStatus::Running);
    assert_eq!(failed.execution_results.len(), 1);
    assert!(failed.execution_results[0].error.is_some());

    // The failed capture attempt left a durable failed pay action.
    let actions = f.actions.search_by_purpose(transaction.id).await.unwrap();
    assert!(actions.iter().any(|action| {
        action.kind == domain::ActionKind::Pay && action.status == domain::ActionStatus::Failed
    }));

    // The retry sweep reclaims the stale lease and the next attempt
    // succeeds.
    f.credit_card.set_fail_on_capture(false);
    assert_eq!(f.tasks.retry(Duration::zero()).await.unwrap(), 1);
    let retried = f.execute_one(TaskKind::SettleCreditCard).await;
    assert_eq!(retried.status, TaskStatus::Executed);
    assert_eq!(retried.number_of_tries, 2);
}

#[tokio::test]
async fn test_abort_reports_to_the_operator() {
    let f = setup();
    let (transaction, _) = f.confirmed_transaction().await;

    // A settlement task with a single try against a failing gateway.
    let settlement = f
        .transactions
        .find(transaction.id)
        .await
        .unwrap()
        .potential_actions
        .unwrap()
        .settle_credit_card
        .remove(0);
    f.tasks
        .save(Task::new(
            TaskPayload::SettleCreditCard {
                transaction_id: transaction.id,
                settlement,
            },
            Utc::now(),
            1,
        ))
        .await
        .unwrap();

    f.credit_card.set_fail_on_capture(true);
    let failed = f.execute_one(TaskKind::SettleCreditCard).await;
    assert_eq!(failed.status, TaskStatus::Running);
    assert_eq!(failed.remaining_tries, 0);

    // The retry sweep must not touch it; the abort sweep terminates it
    // and alerts the operator.
    assert_eq!(f.tasks.retry(Duration::zero()).await.unwrap(), 0);
    let aborted = f
        .dispatcher
        .abort_one_and_report(Duration::zero())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(aborted.status, TaskStatus::Aborted);

    let alerts = f.notifications.sent();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].to, OPERATOR);
    assert!(alerts[0].about.contains("SettleCreditCard"));
}

#[tokio::test]
async fn test_compensations_release_every_external_hold() {
    let f = setup();
    let transaction = f.start().await;

    f.saga
        .authorize_seat_reservation(AuthorizeSeatReservationParams {
            transaction_id: transaction.id,
            agent_id: f.agent.id,
            requested_seats: vec![SeatOfferRequest {
                event_id: EventId::new("evt-1"),
                seat_number: "A-1".to_string(),
                ticket_type_code: "TT-DISCOUNT".to_string(),
            }],
        })
        .await
        .unwrap();
    f.authorize_card(&transaction, 1000).await;
    f.account.set_balance("ACC-001", 500);
    f.saga
        .authorize_account(AuthorizeAccountParams {
            transaction_id: transaction.id,
            agent_id: f.agent.id,
            account_number: "ACC-001".to_string(),
            point_amount: 100,
        })
        .await
        .unwrap();
    f.saga
        .authorize_point_award(AuthorizePointAwardParams {
            transaction_id: transaction.id,
            agent_id: f.agent.id,
            account_number: "ACC-001".to_string(),
            point_amount: 18,
        })
        .await
        .unwrap();
    f.saga
        .authorize_discount_ticket(AuthorizeDiscountTicketParams {
            transaction_id: transaction.id,
            agent_id: f.agent.id,
            amount: Money::from_cents(400),
            units: vec![DiscountTicketUnit {
                event_id: EventId::new("evt-1"),
                seat_number: "A-1".to_string(),
                service_type: "DT-STANDARD".to_string(),
            }],
        })
        .await
        .unwrap();

    assert_eq!(f.seat_reservation.hold_count(), 1);
    assert_eq!(f.credit_card.pending_count(), 1);
    assert_eq!(f.account.pending_count(), 2);
    assert_eq!(f.discount_ticket.authorized_count(), 1);

    f.saga.cancel(transaction.id, f.agent.id).await.unwrap();
    f.dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Canceled)
        .await
        .unwrap()
        .unwrap();

    for kind in [
        TaskKind::CancelSeatReservation,
        TaskKind::CancelCreditCard,
        TaskKind::CancelAccount,
        TaskKind::CancelPointAward,
    ] {
        let task = f.execute_one(kind).await;
        assert_eq!(task.status, TaskStatus::Executed, "kind {kind}");
    }

    assert_eq!(f.seat_reservation.hold_count(), 0);
    assert_eq!(f.credit_card.pending_count(), 0);
    assert_eq!(f.account.pending_count(), 0);
    assert_eq!(f.discount_ticket.authorized_count(), 0);

    // Every authorize action ended up revoked.
    let actions = f.actions.search_by_purpose(transaction.id).await.unwrap();
    assert!(actions
        .iter()
        .filter(|action| action.kind == domain::ActionKind::Authorize)
        .all(|action| action.status == domain::ActionStatus::Canceled));
}

#[tokio::test]
async fn test_expired_transactions_flow_into_the_compensation_set() {
    let f = setup();
    let transaction = f
        .saga
        .start(StartParams {
            expires: Utc::now() + Duration::milliseconds(1),
            agent: f.agent.clone(),
            seller: f.seller.clone(),
            passport_token: None,
        })
        .await
        .unwrap();

    let expired = f
        .transactions
        .make_expired(Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(expired, 1);

    f.dispatcher
        .export_tasks(TransactionKind::PlaceOrder, TransactionStatus::Expired)
        .await
        .unwrap()
        .unwrap();
    let tasks = f.tasks.all().await;
    assert_eq!(tasks.len(), 4);
    assert_eq!(
        f.transactions.find(transaction.id).await.unwrap().status,
        TransactionStatus::Expired
    );
}

#[tokio::test]
async fn test_idle_polls_return_none() {
    let f = setup();
    for kind in TaskKind::ALL {
        assert!(f.executor.execute_by_kind(kind).await.unwrap().is_none());
    }
}
