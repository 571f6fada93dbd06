use super::*;
use crate::message::{Command, CommandMessage};
use crate::state::test_helpers::{MemorySink, ScriptedCommandSource, StalledSink};
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep;

const PERIOD: Duration = Duration::from_secs(10);
const HELLO_B64: &str = "aGVsbG8gd29ybGQ=";

type Inbound = Result<Message, axum::Error>;

/// Test side of a supervised connection.
struct Peer {
    to_server: UnboundedSender<Inbound>,
    from_server: UnboundedReceiver<Message>,
}

impl Peer {
    fn send_text(&self, text: &str) {
        self.to_server
            .unbounded_send(Ok(Message::Text(text.to_string().into())))
            .expect("receiver should be alive");
    }
}

fn start(command_source: Box<dyn CommandSource>) -> (JoinHandle<SupervisorReport>, Peer, Arc<MemorySink>) {
    let (to_server, inbound) = mpsc::unbounded::<Inbound>();
    let (outbound, from_server) = mpsc::unbounded::<Message>();
    let sink = Arc::new(MemorySink::default());
    let ctx = SupervisorContext { frame_sink: sink.clone(), command_source, interval: PERIOD };
    let handle = tokio::spawn(supervise(Uuid::new_v4(), inbound, outbound, ctx));
    (handle, Peer { to_server, from_server }, sink)
}

fn scripted() -> Box<dyn CommandSource> {
    Box::new(ScriptedCommandSource::new(Command::ALL))
}

async fn commands_sent(from_server: UnboundedReceiver<Message>) -> Vec<Command> {
    from_server
        .map(|msg| {
            let Message::Text(text) = msg else { panic!("expected text message") };
            serde_json::from_str::<CommandMessage>(text.as_str())
                .expect("command json")
                .action
        })
        .collect()
        .await
}

#[tokio::test(start_paused = true)]
async fn peer_disconnect_mid_interval_cancels_emitter() {
    let (handle, peer, _sink) = start(scripted());

    sleep(PERIOD + PERIOD / 2).await;
    drop(peer.to_server);

    let report = handle.await.unwrap();
    assert_eq!(report.first, TaskKind::Receive);
    assert_eq!(report.receive, Ok(TaskExit::PeerClosed));
    assert_eq!(report.emit, Ok(TaskExit::Cancelled));
    assert_eq!(report.state, SupervisorState::Done);

    // One command at t=10s; the t=20s tick never fires.
    assert_eq!(commands_sent(peer.from_server).await, vec![Command::PlayPause]);
}

#[tokio::test(start_paused = true)]
async fn close_frame_reaches_done() {
    let (handle, peer, _sink) = start(scripted());
    peer.to_server.unbounded_send(Ok(Message::Close(None))).unwrap();

    let report = handle.await.unwrap();
    assert_eq!(report.first, TaskKind::Receive);
    assert_eq!(report.receive, Ok(TaskExit::PeerClosed));
    assert_eq!(report.emit, Ok(TaskExit::Cancelled));
    assert!(commands_sent(peer.from_server).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn idle_connection_gets_one_command_per_interval() {
    let (handle, peer, _sink) = start(scripted());

    sleep(PERIOD * 3 + Duration::from_millis(1)).await;
    peer.to_server.unbounded_send(Ok(Message::Close(None))).unwrap();
    handle.await.unwrap();

    let sent = commands_sent(peer.from_server).await;
    assert_eq!(sent, vec![Command::PlayPause, Command::Next, Command::Previous]);
}

#[tokio::test(start_paused = true)]
async fn receive_error_tears_down_both_tasks() {
    let (handle, peer, _sink) = start(scripted());
    peer.to_server
        .unbounded_send(Err(axum::Error::new(std::io::Error::other("connection reset"))))
        .unwrap();

    let report = handle.await.unwrap();
    assert_eq!(report.first, TaskKind::Receive);
    assert!(matches!(report.receive, Err(TransportError::Receive(_))));
    assert_eq!(report.emit, Ok(TaskExit::Cancelled));
    assert_eq!(report.state, SupervisorState::Done);
}

#[tokio::test(start_paused = true)]
async fn unwritable_connection_cancels_receiver() {
    let (handle, peer, sink) = start(scripted());
    drop(peer.from_server);

    sleep(PERIOD + Duration::from_millis(1)).await;

    let report = handle.await.unwrap();
    assert_eq!(report.first, TaskKind::Emit);
    assert_eq!(report.emit, Ok(TaskExit::PeerClosed));
    assert_eq!(report.receive, Ok(TaskExit::Cancelled));
    assert!(sink.frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn bad_messages_keep_connection_open() {
    let (handle, peer, sink) = start(scripted());

    peer.send_text("hello");
    peer.send_text(r#"{"type":"camera_frame","data":"@@not base64@@"}"#);
    peer.send_text(&format!(r#"{{"type":"camera_frame","data":"data:image/jpeg;base64,{HELLO_B64}"}}"#));

    sleep(PERIOD * 2 + Duration::from_millis(1)).await;
    assert!(!handle.is_finished(), "connection must stay open");

    let frames = sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].bytes, b"hello world");

    drop(peer.to_server);
    let report = handle.await.unwrap();
    assert_eq!(report.receive, Ok(TaskExit::PeerClosed));
    assert_eq!(commands_sent(peer.from_server).await.len(), 2);
}

struct PanickingSource;

impl CommandSource for PanickingSource {
    fn next_command(&mut self) -> Command {
        panic!("recognizer crashed");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_task_is_reported_as_aborted() {
    let (handle, peer, _sink) = start(Box::new(PanickingSource));

    sleep(PERIOD + Duration::from_millis(1)).await;

    let report = handle.await.unwrap();
    assert_eq!(report.first, TaskKind::Emit);
    assert!(matches!(report.emit, Err(TransportError::Aborted(_))));
    assert_eq!(report.receive, Ok(TaskExit::Cancelled));
    drop(peer);
}

#[tokio::test(start_paused = true)]
async fn close_while_write_is_stalled_reaches_done() {
    let (to_server, inbound) = mpsc::unbounded::<Inbound>();
    let ctx = SupervisorContext {
        frame_sink: Arc::new(MemorySink::default()),
        command_source: scripted(),
        interval: PERIOD,
    };
    let handle = tokio::spawn(supervise(Uuid::new_v4(), inbound, StalledSink, ctx));

    // The first tick parks the emitter inside its write.
    sleep(PERIOD + Duration::from_millis(1)).await;
    assert!(!handle.is_finished());
    to_server.unbounded_send(Ok(Message::Close(None))).unwrap();

    let report = tokio::time::timeout(PERIOD * 100, handle)
        .await
        .expect("supervisor should reach DONE while a write is pending")
        .unwrap();
    assert_eq!(report.first, TaskKind::Receive);
    assert_eq!(report.receive, Ok(TaskExit::PeerClosed));
    assert_eq!(report.emit, Ok(TaskExit::Cancelled));
    assert_eq!(report.state, SupervisorState::Done);
}
