mod test_queue_saturation;
