use super::{test_consumer::TestConsumer, test_producer::TestProducer};

/// Sends every baseline to a new consumer, which acknowledges the producer's
/// current tick. Advance the tick before changing anything else.
pub fn connect(producer: &mut TestProducer) -> TestConsumer {
    let mut consumer = TestConsumer::new(producer.dictionary());
    let bytes = producer.baselines();
    consumer.receive_baselines(&bytes).expect("valid baselines");
    consumer.ack(producer.tick());
    consumer
}

/// Sends everything changed since the consumer's last ack. Returns the number
/// of tables updated.
pub fn exchange_updates(producer: &TestProducer, consumer: &mut TestConsumer) -> usize {
    let bytes = producer.updates_since(consumer.last_ack());
    let tables = consumer.receive_updates(&bytes).expect("valid updates");
    consumer.ack(producer.tick());
    tables
}

/// Runs `change` on a fresh tick, then exchanges updates
pub fn tick_and_exchange<F: FnOnce(&mut TestProducer)>(
    producer: &mut TestProducer,
    consumer: &mut TestConsumer,
    change: F,
) -> usize {
    producer.advance_tick();
    change(producer);
    exchange_updates(producer, consumer)
}
